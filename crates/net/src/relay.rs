//! Publish/subscribe relay abstraction.
//!
//! A relay moves JSON payloads between every subscriber of a topic and keeps a
//! per-topic presence map (key -> latest metadata). Everything is poll-driven:
//! the single-threaded driver calls [`Relay::poll`] at a well-defined point of
//! its frame and handles the returned notices there.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::NetError;

/// Latest presence metadata per key on one topic
pub type PresenceState = BTreeMap<String, Value>;

/// Connection state of one topic subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Closed,
    Joining,
    Joined,
    Errored,
}

impl ChannelState {
    /// Joined or on its way there
    pub fn is_healthy(&self) -> bool {
        matches!(self, ChannelState::Joined | ChannelState::Joining)
    }
}

/// Something that happened on the relay since the last poll
#[derive(Debug, Clone, PartialEq)]
pub enum RelayNotice {
    /// The subscription to `topic` is confirmed
    Subscribed { topic: String },
    /// A payload published on `topic` (own publishes included)
    Message { topic: String, payload: Value },
    /// Full presence map of `topic` after a sync, join, or leave
    Presence { topic: String, state: PresenceState },
    /// The subscription was dropped by the relay
    Closed { topic: String },
}

pub trait Relay {
    fn subscribe(&mut self, topic: &str) -> Result<(), NetError>;

    fn unsubscribe(&mut self, topic: &str) -> Result<(), NetError>;

    /// Fire-and-forget publish to every subscriber of `topic`
    fn publish(&mut self, topic: &str, payload: Value) -> Result<(), NetError>;

    fn channel_state(&self, topic: &str) -> ChannelState;

    /// Advertise `meta` under `key` until untracked or disconnected
    fn track(&mut self, topic: &str, key: &str, meta: Value) -> Result<(), NetError>;

    fn untrack(&mut self, topic: &str, key: &str) -> Result<(), NetError>;

    /// Drain notices received since the last call
    fn poll(&mut self) -> Vec<RelayNotice>;
}

impl<R: Relay + ?Sized> Relay for Box<R> {
    fn subscribe(&mut self, topic: &str) -> Result<(), NetError> {
        (**self).subscribe(topic)
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), NetError> {
        (**self).unsubscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: Value) -> Result<(), NetError> {
        (**self).publish(topic, payload)
    }

    fn channel_state(&self, topic: &str) -> ChannelState {
        (**self).channel_state(topic)
    }

    fn track(&mut self, topic: &str, key: &str, meta: Value) -> Result<(), NetError> {
        (**self).track(topic, key, meta)
    }

    fn untrack(&mut self, topic: &str, key: &str) -> Result<(), NetError> {
        (**self).untrack(topic, key)
    }

    fn poll(&mut self) -> Vec<RelayNotice> {
        (**self).poll()
    }
}
