//! Room transport client
//!
//! Joins one room topic on a [`Relay`], announces the local participant, and
//! dispatches decoded [`RoomEvent`]s to a handler. A periodic health check
//! tears down and re-subscribes a channel that fell out of the joined state.
//! Everything runs inside [`TransportClient::poll`], driven by the host's frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::protocol::{PeerPayload, RoomEvent};
use crate::relay::{ChannelState, Relay, RelayNotice};

/// Transport timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    pub health_check_ms: u64,
    pub reconnect_backoff_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            health_check_ms: 5_000,
            reconnect_backoff_ms: 1_000,
        }
    }
}

impl TransportConfig {
    /// Create from `TETRIS_HEALTH_CHECK_MS` / `TETRIS_RECONNECT_BACKOFF_MS`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let health_check_ms = env::var("TETRIS_HEALTH_CHECK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.health_check_ms);
        let reconnect_backoff_ms = env::var("TETRIS_RECONNECT_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.reconnect_backoff_ms);

        Self {
            health_check_ms,
            reconnect_backoff_ms,
        }
    }
}

/// Receives room events that survived decoding and echo filtering
pub trait RoomEventHandler {
    fn on_event(&mut self, event: RoomEvent);
}

impl<F: FnMut(RoomEvent)> RoomEventHandler for F {
    fn on_event(&mut self, event: RoomEvent) {
        self(event)
    }
}

/// Shared FIFO handler; keep a clone and [`drain`](EventQueue::drain) it
/// after each poll.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<VecDeque<RoomEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<RoomEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl RoomEventHandler for EventQueue {
    fn on_event(&mut self, event: RoomEvent) {
        self.inner.borrow_mut().push_back(event);
    }
}

/// Topic name for a room id
pub fn room_topic(room_id: &str) -> String {
    format!("room:{room_id}")
}

/// Random participant id, unique enough for a two-player room
pub fn generate_user_id() -> String {
    let n: u64 = rand::thread_rng().gen();
    format!("user-{n:016x}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Idle,
    Subscribing,
    Subscribed,
    /// Waiting to re-subscribe; `None` until the next poll stamps a deadline
    Backoff { until: Option<u64> },
}

struct RoomSession {
    room_id: String,
    topic: String,
    name: Option<String>,
    handler: Box<dyn RoomEventHandler>,
}

pub struct TransportClient<R: Relay> {
    relay: R,
    config: TransportConfig,
    user_id: String,
    room: Option<RoomSession>,
    link: Link,
    health_due: Option<u64>,
    visible: bool,
}

impl<R: Relay> TransportClient<R> {
    pub fn new(relay: R, config: TransportConfig) -> Self {
        Self {
            relay,
            config,
            user_id: generate_user_id(),
            room: None,
            link: Link::Idle,
            health_due: None,
            visible: true,
        }
    }

    /// Replace the generated participant id
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.room_id.as_str())
    }

    /// Subscription confirmed and not yet torn down
    pub fn is_joined(&self) -> bool {
        self.link == Link::Subscribed
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    pub fn relay_mut(&mut self) -> &mut R {
        &mut self.relay
    }

    /// Enter `room_id`, leaving any current room first.
    ///
    /// The `join` announcement goes out once the relay confirms the
    /// subscription; a failed subscribe is retried after the backoff.
    pub fn join(
        &mut self,
        room_id: &str,
        name: Option<&str>,
        handler: Box<dyn RoomEventHandler>,
    ) {
        self.leave();

        let topic = room_topic(room_id);
        info!(room_id, user_id = %self.user_id, "joining room");
        self.room = Some(RoomSession {
            room_id: room_id.to_string(),
            topic: topic.clone(),
            name: name.map(str::to_string),
            handler,
        });

        match self.relay.subscribe(&topic) {
            Ok(()) => self.link = Link::Subscribing,
            Err(e) => {
                warn!(%topic, error = %e, "subscribe failed");
                self.link = Link::Backoff { until: None };
            }
        }
        self.health_due = None;
    }

    /// Drain relay notices, dispatch room events, and run timers
    pub fn poll(&mut self, now_ms: u64) {
        for notice in self.relay.poll() {
            self.handle_notice(notice, now_ms);
        }

        match self.link {
            Link::Idle => {}
            Link::Subscribing | Link::Subscribed => {
                let due = *self
                    .health_due
                    .get_or_insert(now_ms + self.config.health_check_ms);
                if now_ms >= due {
                    self.check_health(now_ms);
                }
            }
            Link::Backoff { until: None } => {
                self.link = Link::Backoff {
                    until: Some(now_ms + self.config.reconnect_backoff_ms),
                };
            }
            Link::Backoff { until: Some(until) } => {
                if now_ms >= until {
                    self.resubscribe(now_ms);
                }
            }
        }
    }

    fn handle_notice(&mut self, notice: RelayNotice, now_ms: u64) {
        let Some(room) = self.room.as_ref() else {
            return;
        };

        match notice {
            RelayNotice::Subscribed { topic } if topic == room.topic => {
                debug!(%topic, "room subscription confirmed");
                let join = RoomEvent::Join(PeerPayload {
                    user_id: self.user_id.clone(),
                    name: room.name.clone(),
                });
                self.link = Link::Subscribed;
                self.health_due = Some(now_ms + self.config.health_check_ms);
                self.send(&join);
            }
            RelayNotice::Message { topic, payload } if topic == room.topic => {
                let event = match serde_json::from_value::<RoomEvent>(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(%topic, error = %e, "dropping malformed room event");
                        return;
                    }
                };
                if self.is_own_echo(&event) {
                    return;
                }
                if let Some(room) = self.room.as_mut() {
                    room.handler.on_event(event);
                }
            }
            RelayNotice::Closed { topic } if topic == room.topic => {
                debug!(%topic, "room channel closed by relay");
            }
            _ => {}
        }
    }

    fn is_own_echo(&self, event: &RoomEvent) -> bool {
        match event {
            RoomEvent::Join(p) | RoomEvent::Leave(p) => p.user_id == self.user_id,
            _ => false,
        }
    }

    fn check_health(&mut self, now_ms: u64) {
        let Some(topic) = self.room.as_ref().map(|r| r.topic.clone()) else {
            return;
        };
        let state = self.relay.channel_state(&topic);
        if state.is_healthy() {
            self.health_due = Some(now_ms + self.config.health_check_ms);
            return;
        }

        warn!(%topic, ?state, "room channel unhealthy, reconnecting");
        if let Err(e) = self.relay.unsubscribe(&topic) {
            debug!(%topic, error = %e, "unsubscribe during teardown failed");
        }
        self.link = Link::Backoff {
            until: Some(now_ms + self.config.reconnect_backoff_ms),
        };
        self.health_due = None;
    }

    fn resubscribe(&mut self, now_ms: u64) {
        let Some(topic) = self.room.as_ref().map(|r| r.topic.clone()) else {
            self.link = Link::Idle;
            return;
        };
        match self.relay.subscribe(&topic) {
            Ok(()) => {
                info!(%topic, "re-subscribed to room");
                self.link = Link::Subscribing;
                self.health_due = None;
            }
            Err(e) => {
                warn!(%topic, error = %e, "re-subscribe failed");
                self.link = Link::Backoff {
                    until: Some(now_ms + self.config.reconnect_backoff_ms),
                };
            }
        }
    }

    /// Publish `event` to the room. Returns false if it could not be sent.
    pub fn send(&mut self, event: &RoomEvent) -> bool {
        let Some(topic) = self.room.as_ref().map(|r| r.topic.as_str()) else {
            debug!(kind = event.kind(), "send outside a room ignored");
            return false;
        };
        let payload = match serde_json::to_value(event) {
            Ok(v) => v,
            Err(e) => {
                warn!(kind = event.kind(), error = %e, "failed to encode room event");
                return false;
            }
        };
        match self.relay.publish(topic, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(%topic, kind = event.kind(), error = %e, "publish failed");
                false
            }
        }
    }

    /// Best-effort `leave`, then tear down. Safe to call repeatedly.
    pub fn leave(&mut self) {
        if self.room.is_none() {
            return;
        }
        if self.link == Link::Subscribed {
            let leave = RoomEvent::Leave(PeerPayload {
                user_id: self.user_id.clone(),
                name: self.room.as_ref().and_then(|r| r.name.clone()),
            });
            self.send(&leave);
        }
        if let Some(room) = self.room.take() {
            info!(room_id = %room.room_id, "leaving room");
            if let Err(e) = self.relay.unsubscribe(&room.topic) {
                debug!(topic = %room.topic, error = %e, "unsubscribe on leave failed");
            }
        }
        self.link = Link::Idle;
        self.health_due = None;
    }

    /// Page visibility hook; hidden -> visible runs the health check at once
    pub fn on_visibility_change(&mut self, visible: bool, now_ms: u64) {
        let was_visible = self.visible;
        self.visible = visible;
        if !was_visible
            && visible
            && matches!(self.link, Link::Subscribing | Link::Subscribed)
        {
            self.check_health(now_ms);
        }
    }

    /// Current channel state of the room topic
    pub fn channel_state(&self) -> ChannelState {
        match self.room.as_ref() {
            Some(room) => self.relay.channel_state(&room.topic),
            None => ChannelState::Closed,
        }
    }
}

impl<R: Relay> Drop for TransportClient<R> {
    fn drop(&mut self) {
        self.leave();
    }
}
