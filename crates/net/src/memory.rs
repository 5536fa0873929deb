//! In-process relay hub.
//!
//! Single-threaded stand-in for a network relay: every [`MemoryRelay`] handle
//! shares one [`MemoryHub`]. Deliveries land in per-handle inboxes and surface on
//! the next [`Relay::poll`], sender included.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::error::NetError;
use crate::relay::{ChannelState, PresenceState, Relay, RelayNotice};

type ClientId = u64;

#[derive(Debug, Default)]
struct Topic {
    subscribers: BTreeSet<ClientId>,
    presence: BTreeMap<String, (ClientId, Value)>,
}

impl Topic {
    fn presence_state(&self) -> PresenceState {
        self.presence
            .iter()
            .map(|(key, (_, meta))| (key.clone(), meta.clone()))
            .collect()
    }
}

#[derive(Debug, Default)]
struct Client {
    inbox: VecDeque<RelayNotice>,
    channels: HashMap<String, ChannelState>,
}

#[derive(Debug, Default)]
struct HubInner {
    next_client: ClientId,
    topics: HashMap<String, Topic>,
    clients: HashMap<ClientId, Client>,
}

impl HubInner {
    fn state_of(&self, client: ClientId, topic: &str) -> ChannelState {
        self.clients
            .get(&client)
            .and_then(|c| c.channels.get(topic))
            .copied()
            .unwrap_or(ChannelState::Closed)
    }

    fn require_joined(&self, client: ClientId, topic: &str) -> Result<(), NetError> {
        match self.state_of(client, topic) {
            ChannelState::Joined => Ok(()),
            state => Err(NetError::NotJoined {
                topic: topic.to_string(),
                state,
            }),
        }
    }

    fn deliver(&mut self, to: ClientId, notice: RelayNotice) {
        if let Some(client) = self.clients.get_mut(&to) {
            client.inbox.push_back(notice);
        }
    }

    fn broadcast(&mut self, topic: &str, notice: RelayNotice) {
        let subscribers: Vec<ClientId> = match self.topics.get(topic) {
            Some(t) => t.subscribers.iter().copied().collect(),
            None => return,
        };
        for id in subscribers {
            self.deliver(id, notice.clone());
        }
    }

    fn broadcast_presence(&mut self, topic: &str) {
        let Some(state) = self.topics.get(topic).map(Topic::presence_state) else {
            return;
        };
        self.broadcast(
            topic,
            RelayNotice::Presence {
                topic: topic.to_string(),
                state,
            },
        );
    }

    /// Drop `client` from `topic`, releasing its presence keys
    fn detach(&mut self, client: ClientId, topic: &str, new_state: ChannelState) {
        let mut presence_changed = false;
        if let Some(t) = self.topics.get_mut(topic) {
            t.subscribers.remove(&client);
            let before = t.presence.len();
            t.presence.retain(|_, (owner, _)| *owner != client);
            presence_changed = t.presence.len() != before;
        }
        if let Some(c) = self.clients.get_mut(&client) {
            c.channels.insert(topic.to_string(), new_state);
        }
        if presence_changed {
            self.broadcast_presence(topic);
        }
    }
}

/// Shared in-process hub; clone freely
#[derive(Debug, Clone, Default)]
pub struct MemoryHub {
    inner: Rc<RefCell<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client handle on this hub
    pub fn connect(&self) -> MemoryRelay {
        let mut inner = self.inner.borrow_mut();
        inner.next_client += 1;
        let id = inner.next_client;
        inner.clients.insert(id, Client::default());
        MemoryRelay {
            hub: Rc::clone(&self.inner),
            id,
        }
    }

    /// Knock every subscriber of `topic` into the errored state
    pub fn fail(&self, topic: &str) {
        let mut inner = self.inner.borrow_mut();
        let subscribers: Vec<ClientId> = match inner.topics.get(topic) {
            Some(t) => t.subscribers.iter().copied().collect(),
            None => return,
        };
        debug!(topic, count = subscribers.len(), "failing memory topic");
        for id in subscribers {
            inner.detach(id, topic, ChannelState::Errored);
            inner.deliver(
                id,
                RelayNotice::Closed {
                    topic: topic.to_string(),
                },
            );
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .borrow()
            .topics
            .get(topic)
            .map(|t| t.subscribers.len())
            .unwrap_or(0)
    }
}

/// One client's handle on a [`MemoryHub`]
#[derive(Debug)]
pub struct MemoryRelay {
    hub: Rc<RefCell<HubInner>>,
    id: ClientId,
}

impl Relay for MemoryRelay {
    fn subscribe(&mut self, topic: &str) -> Result<(), NetError> {
        let mut inner = self.hub.borrow_mut();
        let t = inner.topics.entry(topic.to_string()).or_default();
        t.subscribers.insert(self.id);
        let state = t.presence_state();

        if let Some(c) = inner.clients.get_mut(&self.id) {
            c.channels.insert(topic.to_string(), ChannelState::Joined);
        }
        inner.deliver(
            self.id,
            RelayNotice::Subscribed {
                topic: topic.to_string(),
            },
        );
        inner.deliver(
            self.id,
            RelayNotice::Presence {
                topic: topic.to_string(),
                state,
            },
        );
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<(), NetError> {
        self.hub
            .borrow_mut()
            .detach(self.id, topic, ChannelState::Closed);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: Value) -> Result<(), NetError> {
        let mut inner = self.hub.borrow_mut();
        inner.require_joined(self.id, topic)?;
        inner.broadcast(
            topic,
            RelayNotice::Message {
                topic: topic.to_string(),
                payload,
            },
        );
        Ok(())
    }

    fn channel_state(&self, topic: &str) -> ChannelState {
        self.hub.borrow().state_of(self.id, topic)
    }

    fn track(&mut self, topic: &str, key: &str, meta: Value) -> Result<(), NetError> {
        let mut inner = self.hub.borrow_mut();
        inner.require_joined(self.id, topic)?;
        if let Some(t) = inner.topics.get_mut(topic) {
            t.presence.insert(key.to_string(), (self.id, meta));
        }
        inner.broadcast_presence(topic);
        Ok(())
    }

    fn untrack(&mut self, topic: &str, key: &str) -> Result<(), NetError> {
        let mut inner = self.hub.borrow_mut();
        let id = self.id;
        let removed = match inner.topics.get_mut(topic) {
            Some(t) => {
                let owned = matches!(t.presence.get(key), Some((owner, _)) if *owner == id);
                owned && t.presence.remove(key).is_some()
            }
            None => false,
        };
        if removed {
            inner.broadcast_presence(topic);
        }
        Ok(())
    }

    fn poll(&mut self) -> Vec<RelayNotice> {
        self.hub
            .borrow_mut()
            .clients
            .get_mut(&self.id)
            .map(|c| c.inbox.drain(..).collect())
            .unwrap_or_default()
    }
}

impl Drop for MemoryRelay {
    fn drop(&mut self) {
        let Ok(mut inner) = self.hub.try_borrow_mut() else {
            return;
        };
        let topics: Vec<String> = inner
            .clients
            .get(&self.id)
            .map(|c| c.channels.keys().cloned().collect())
            .unwrap_or_default();
        for topic in topics {
            inner.detach(self.id, &topic, ChannelState::Closed);
        }
        inner.clients.remove(&self.id);
    }
}
