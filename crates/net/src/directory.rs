//! Session directory (lobby)
//!
//! Hosts advertise open rooms as presence records on the [`LOBBY_TOPIC`] and
//! refresh them with a heartbeat. Every presence sync rebuilds the room list
//! from the latest record per key; records that stop being refreshed are pruned.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::protocol::LobbyRoom;
use crate::relay::{PresenceState, Relay, RelayNotice};
use crate::transport::generate_user_id;

pub const LOBBY_TOPIC: &str = "lobby";

/// Players per room
pub const ROOM_CAPACITY: u8 = 2;

const DEFAULT_NICKNAME: &str = "Anonymous";
const ROOM_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub heartbeat_ms: u64,
    pub stale_after_ms: u64,
    /// Wait before re-subscribing to a closed or unreachable lobby
    pub reconnect_backoff_ms: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            heartbeat_ms: 4_000,
            stale_after_ms: 15_000,
            reconnect_backoff_ms: 1_000,
        }
    }
}

impl DirectoryConfig {
    /// Create from `TETRIS_LOBBY_HEARTBEAT_MS` / `TETRIS_LOBBY_STALE_MS` /
    /// `TETRIS_LOBBY_BACKOFF_MS`
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let heartbeat_ms = env::var("TETRIS_LOBBY_HEARTBEAT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.heartbeat_ms);
        let stale_after_ms = env::var("TETRIS_LOBBY_STALE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.stale_after_ms);
        let reconnect_backoff_ms = env::var("TETRIS_LOBBY_BACKOFF_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.reconnect_backoff_ms);

        Self {
            heartbeat_ms,
            stale_after_ms,
            reconnect_backoff_ms,
        }
    }
}

/// `room-` followed by six base-36 characters
pub fn generate_room_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect();
    format!("room-{suffix}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LobbyLink {
    Subscribing,
    Subscribed,
    /// Waiting to re-subscribe; `None` until the next poll stamps a deadline
    Backoff { until: Option<u64> },
}

pub struct SessionDirectory<R: Relay> {
    relay: R,
    config: DirectoryConfig,
    /// Presence key of this client
    key: String,
    nickname: String,
    link: LobbyLink,
    own_room: Option<LobbyRoom>,
    next_heartbeat: Option<u64>,
    rooms: BTreeMap<String, LobbyRoom>,
}

impl<R: Relay> SessionDirectory<R> {
    /// Subscribe to the lobby; rooms appear after the first presence sync
    pub fn new(relay: R, config: DirectoryConfig) -> Self {
        let mut dir = Self {
            relay,
            config,
            key: generate_user_id(),
            nickname: DEFAULT_NICKNAME.to_string(),
            link: LobbyLink::Subscribing,
            own_room: None,
            next_heartbeat: None,
            rooms: BTreeMap::new(),
        };
        dir.subscribe();
        dir
    }

    fn subscribe(&mut self) {
        self.link = match self.relay.subscribe(LOBBY_TOPIC) {
            Ok(()) => LobbyLink::Subscribing,
            Err(e) => {
                warn!(error = %e, "lobby subscribe failed");
                LobbyLink::Backoff { until: None }
            }
        };
    }

    /// True once the lobby subscription is confirmed
    pub fn is_connected(&self) -> bool {
        self.link == LobbyLink::Subscribed
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Blank names fall back to "Anonymous"
    pub fn set_nickname(&mut self, name: &str) {
        let trimmed = name.trim();
        self.nickname = if trimmed.is_empty() {
            DEFAULT_NICKNAME.to_string()
        } else {
            trimmed.to_string()
        };
        if let Some(room) = self.own_room.as_mut() {
            room.host = self.nickname.clone();
        }
    }

    /// Advertise a new room hosted here and return its id
    pub fn create_room(&mut self, title: &str, now_ms: u64) -> String {
        let id = generate_room_id();
        let title = match title.trim() {
            "" => format!("{}'s room", self.nickname),
            t => t.to_string(),
        };
        info!(room_id = %id, %title, "creating room");
        self.own_room = Some(LobbyRoom {
            id: id.clone(),
            host: self.nickname.clone(),
            title,
            players: 1,
            max: ROOM_CAPACITY,
            updated_at: now_ms,
        });
        self.heartbeat(now_ms);
        id
    }

    pub fn own_room(&self) -> Option<&LobbyRoom> {
        self.own_room.as_ref()
    }

    /// Update the advertised player count, clamped to 1..=2
    pub fn update_players(&mut self, count: u8, now_ms: u64) {
        let Some(room) = self.own_room.as_mut() else {
            return;
        };
        room.players = count.clamp(1, ROOM_CAPACITY);
        self.heartbeat(now_ms);
    }

    /// Stop advertising the hosted room
    pub fn close_room(&mut self) {
        let Some(room) = self.own_room.take() else {
            return;
        };
        info!(room_id = %room.id, "closing room");
        self.rooms.remove(&room.id);
        self.next_heartbeat = None;
        if let Err(e) = self.relay.untrack(LOBBY_TOPIC, &self.key) {
            debug!(error = %e, "lobby untrack failed");
        }
    }

    fn heartbeat(&mut self, now_ms: u64) {
        let Some(room) = self.own_room.as_mut() else {
            return;
        };
        room.updated_at = now_ms;
        let room = room.clone();
        self.next_heartbeat = Some(now_ms + self.config.heartbeat_ms);

        if self.is_connected() {
            match serde_json::to_value(&room) {
                Ok(meta) => {
                    if let Err(e) = self.relay.track(LOBBY_TOPIC, &self.key, meta) {
                        warn!(error = %e, "lobby heartbeat failed");
                    }
                }
                Err(e) => warn!(error = %e, "failed to encode lobby room"),
            }
        }
        self.rooms.insert(room.id.clone(), room);
    }

    fn rebuild(&mut self, state: &PresenceState) {
        self.rooms.clear();
        for (key, meta) in state {
            match serde_json::from_value::<LobbyRoom>(meta.clone()) {
                Ok(room) => {
                    self.rooms.insert(room.id.clone(), room);
                }
                Err(e) => debug!(%key, error = %e, "skipping malformed lobby record"),
            }
        }
        if let Some(room) = self.own_room.as_ref() {
            self.rooms.insert(room.id.clone(), room.clone());
        }
    }

    /// Handle lobby notices, heartbeat, and prune. Returns true if the room
    /// list changed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        let mut changed = false;

        for notice in self.relay.poll() {
            match notice {
                RelayNotice::Subscribed { topic } if topic == LOBBY_TOPIC => {
                    self.link = LobbyLink::Subscribed;
                    self.heartbeat(now_ms);
                }
                RelayNotice::Presence { topic, state } if topic == LOBBY_TOPIC => {
                    self.rebuild(&state);
                    changed = true;
                }
                RelayNotice::Closed { topic } if topic == LOBBY_TOPIC => {
                    warn!("lobby channel closed");
                    self.link = LobbyLink::Backoff { until: None };
                }
                _ => {}
            }
        }

        if let LobbyLink::Backoff { until } = self.link {
            let due = until.unwrap_or(now_ms + self.config.reconnect_backoff_ms);
            if now_ms >= due && until.is_some() {
                debug!("re-subscribing to lobby");
                self.subscribe();
            } else {
                self.link = LobbyLink::Backoff { until: Some(due) };
            }
        }

        if let Some(due) = self.next_heartbeat {
            if now_ms >= due {
                self.heartbeat(now_ms);
            }
        }

        let stale_after = self.config.stale_after_ms;
        let before = self.rooms.len();
        self.rooms
            .retain(|_, room| now_ms.saturating_sub(room.updated_at) <= stale_after);
        changed |= self.rooms.len() != before;

        changed
    }

    /// Open rooms, newest heartbeat first
    pub fn rooms(&self) -> Vec<LobbyRoom> {
        let mut rooms: Vec<LobbyRoom> = self.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        rooms
    }
}

impl<R: Relay> Drop for SessionDirectory<R> {
    fn drop(&mut self) {
        self.close_room();
        if let Err(e) = self.relay.unsubscribe(LOBBY_TOPIC) {
            debug!(error = %e, "lobby unsubscribe failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_shape() {
        for _ in 0..50 {
            let id = generate_room_id();
            let suffix = id.strip_prefix("room-").unwrap();
            assert_eq!(suffix.len(), 6);
            assert!(suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = DirectoryConfig::default();
        assert_eq!(config.heartbeat_ms, 4_000);
        assert_eq!(config.stale_after_ms, 15_000);
        assert_eq!(config.reconnect_backoff_ms, 1_000);
    }
}
