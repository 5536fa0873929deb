//! Protocol module - JSON message types
//!
//! Two layers share this module:
//!
//! - **Room events**, exchanged between the two players of a room:
//!   `{"type": "<kind>", "payload": {...}}` with camelCase payload fields.
//! - **Relay frames**, line-delimited JSON between a [`TcpRelay`](crate::TcpRelay)
//!   and the relay server, tagged by `op`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::GameSnapshot;
use crate::relay::PresenceState;
use crate::types::{GameStatus, PieceKind, Rotation, FIELD_HEIGHT, FIELD_WIDTH};

// ============== Room Events ==============

/// Everything two players say to each other through a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RoomEvent {
    State(StatePayload),
    Join(PeerPayload),
    Leave(PeerPayload),
    Ready(ReadyPayload),
    Start(StartPayload),
    HostInfo(HostInfoPayload),
}

impl RoomEvent {
    /// Sender id, for the events that carry one
    pub fn user_id(&self) -> Option<&str> {
        match self {
            RoomEvent::State(p) => Some(&p.user_id),
            RoomEvent::Join(p) | RoomEvent::Leave(p) => Some(&p.user_id),
            RoomEvent::Ready(p) => Some(&p.user_id),
            RoomEvent::HostInfo(p) => Some(&p.user_id),
            RoomEvent::Start(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RoomEvent::State(_) => "state",
            RoomEvent::Join(_) => "join",
            RoomEvent::Leave(_) => "leave",
            RoomEvent::Ready(_) => "ready",
            RoomEvent::Start(_) => "start",
            RoomEvent::HostInfo(_) => "host_info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub user_id: String,
    #[serde(flatten)]
    pub snapshot: OpponentSnapshot,
    /// Garbage rows the receiver should add
    #[serde(default)]
    pub attack: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub user_id: String,
    pub ready: bool,
}

/// Shared seed plus the absolute wall-clock time (epoch ms) the match begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {
    pub seed: u32,
    pub at: u64,
}

/// Host announcement, sent in answer to a guest's join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostInfoPayload {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// What one player shows the other. Never merged into local state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentSnapshot {
    /// 22x10 occupancy grid of 0/1
    pub field: Vec<Vec<u8>>,
    pub active: Option<WirePiece>,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub status: WireStatus,
}

impl OpponentSnapshot {
    pub fn from_game(snapshot: &GameSnapshot) -> Self {
        Self {
            field: snapshot.occupancy(),
            active: snapshot.active.map(|a| WirePiece {
                kind: a.kind.as_str().to_string(),
                x: a.x,
                y: a.y,
                rotation: a.rotation.index(),
            }),
            score: snapshot.score,
            level: snapshot.level,
            lines: snapshot.lines,
            status: snapshot.status.into(),
        }
    }

    /// Blank 22x10 board, used before the first opponent state arrives
    pub fn empty() -> Self {
        Self {
            field: vec![vec![0; FIELD_WIDTH as usize]; FIELD_HEIGHT as usize],
            active: None,
            score: 0,
            level: 1,
            lines: 0,
            status: WireStatus::Menu,
        }
    }

    /// Filled rows counted from the floor up to the highest filled cell
    pub fn stack_height(&self) -> usize {
        self.field
            .iter()
            .position(|row| row.iter().any(|&c| c != 0))
            .map(|top| self.field.len() - top)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePiece {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i8,
    pub y: i8,
    pub rotation: u8,
}

impl WirePiece {
    pub fn piece_kind(&self) -> Option<PieceKind> {
        PieceKind::from_str(&self.kind)
    }

    pub fn rotation(&self) -> Rotation {
        Rotation::from_index(i32::from(self.rotation))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    Playing,
    Paused,
    Gameover,
    Menu,
}

impl From<GameStatus> for WireStatus {
    fn from(status: GameStatus) -> Self {
        match status {
            GameStatus::Playing => WireStatus::Playing,
            GameStatus::Paused => WireStatus::Paused,
            GameStatus::GameOver => WireStatus::Gameover,
            GameStatus::Menu => WireStatus::Menu,
        }
    }
}

// ============== Lobby ==============

/// One advertised room, as carried in a host's presence record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyRoom {
    pub id: String,
    pub host: String,
    pub title: String,
    pub players: u8,
    pub max: u8,
    pub updated_at: u64,
}

// ============== Relay Frames ==============

/// Client -> relay server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelayRequest {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Publish { topic: String, payload: Value },
    Track { topic: String, key: String, meta: Value },
    Untrack { topic: String, key: String },
}

/// Relay server -> client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelayPush {
    Subscribed { topic: String },
    Message { topic: String, payload: Value },
    Presence { topic: String, state: PresenceState },
    Error { message: String },
}

/// Parse one relay line
pub fn parse_request(line: &str) -> Result<RelayRequest, serde_json::Error> {
    serde_json::from_str(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GameState;
    use serde_json::json;

    #[test]
    fn test_room_event_wire_shape() {
        let event = RoomEvent::Start(StartPayload { seed: 42, at: 1_000 });
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v, json!({"type": "start", "payload": {"seed": 42, "at": 1000}}));

        let join = RoomEvent::Join(PeerPayload {
            user_id: "u1".into(),
            name: Some("ann".into()),
        });
        let v = serde_json::to_value(&join).unwrap();
        assert_eq!(
            v,
            json!({"type": "join", "payload": {"userId": "u1", "name": "ann"}})
        );

        let host = RoomEvent::HostInfo(HostInfoPayload {
            user_id: "h".into(),
            name: None,
        });
        assert_eq!(serde_json::to_value(&host).unwrap()["type"], "host_info");
    }

    #[test]
    fn test_state_payload_flattens_snapshot() {
        let game = GameState::new(5);
        let payload = StatePayload {
            user_id: "me".into(),
            snapshot: OpponentSnapshot::from_game(&game.snapshot()),
            attack: 2,
        };
        let v = serde_json::to_value(RoomEvent::State(payload.clone())).unwrap();

        let p = &v["payload"];
        assert_eq!(p["userId"], "me");
        assert_eq!(p["attack"], 2);
        assert_eq!(p["status"], "playing");
        assert_eq!(p["field"].as_array().unwrap().len(), 22);
        assert_eq!(p["field"][0].as_array().unwrap().len(), 10);
        assert!(p["active"]["type"].is_string());

        let back: RoomEvent = serde_json::from_value(v).unwrap();
        assert_eq!(back, RoomEvent::State(payload));
    }

    #[test]
    fn test_state_without_attack_defaults_to_zero() {
        let v = json!({
            "type": "state",
            "payload": {
                "userId": "peer",
                "field": [],
                "active": null,
                "score": 0,
                "level": 1,
                "lines": 0,
                "status": "gameover"
            }
        });
        let RoomEvent::State(p) = serde_json::from_value(v).unwrap() else {
            panic!("expected state");
        };
        assert_eq!(p.attack, 0);
        assert_eq!(p.snapshot.status, WireStatus::Gameover);
        assert!(p.snapshot.active.is_none());
    }

    #[test]
    fn test_unknown_event_kind_is_rejected() {
        let v = json!({"type": "chat", "payload": {"userId": "x"}});
        assert!(serde_json::from_value::<RoomEvent>(v).is_err());
    }

    #[test]
    fn test_relay_frames() {
        let req = parse_request(r#"{"op":"publish","topic":"room:a","payload":{"k":1}}"#).unwrap();
        assert_eq!(
            req,
            RelayRequest::Publish {
                topic: "room:a".into(),
                payload: json!({"k": 1}),
            }
        );
        assert!(parse_request(r#"{"op":"explode"}"#).is_err());

        let push = RelayPush::Subscribed { topic: "lobby".into() };
        assert_eq!(
            serde_json::to_string(&push).unwrap(),
            r#"{"op":"subscribed","topic":"lobby"}"#
        );
    }

    #[test]
    fn test_lobby_room_camel_case() {
        let room = LobbyRoom {
            id: "room-abc123".into(),
            host: "ann".into(),
            title: "Room".into(),
            players: 1,
            max: 2,
            updated_at: 99,
        };
        let v = serde_json::to_value(&room).unwrap();
        assert_eq!(v["updatedAt"], 99);
    }

    #[test]
    fn test_opponent_stack_height() {
        let mut snap = OpponentSnapshot::empty();
        assert_eq!(snap.stack_height(), 0);
        snap.field[19][3] = 1;
        assert_eq!(snap.stack_height(), 3);
    }
}
