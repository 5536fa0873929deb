//! Networking for two-player rooms
//!
//! - `relay`: the publish/subscribe seam with in-memory and TCP backends
//! - `server`: the relay server the TCP backend talks to
//! - `transport`: room join/leave, event dispatch, health check
//! - `directory`: lobby of open rooms built on presence
//! - `sync` / `attack`: synchronized start and line-clear attacks

pub mod attack;
pub mod directory;
pub mod error;
pub mod memory;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod sync;
pub mod tcp;
pub mod transport;

pub use versus_tetris_core as core;
pub use versus_tetris_types as types;

pub use attack::AttackMeter;
pub use directory::{generate_room_id, DirectoryConfig, SessionDirectory, LOBBY_TOPIC};
pub use error::NetError;
pub use memory::{MemoryHub, MemoryRelay};
pub use protocol::{
    HostInfoPayload, LobbyRoom, OpponentSnapshot, PeerPayload, ReadyPayload, RelayPush,
    RelayRequest, RoomEvent, StartPayload, StatePayload, WirePiece, WireStatus,
};
pub use relay::{ChannelState, PresenceState, Relay, RelayNotice};
pub use server::{run_relay_server, RelayServerConfig, MAX_LINE_BYTES};
pub use sync::{
    countdown_delay, plan_start, random_seed, Countdown, CountdownStep, COUNTDOWN_MS,
    COUNTDOWN_STEP_MS, START_LEAD_MS,
};
pub use tcp::TcpRelay;
pub use transport::{
    generate_user_id, room_topic, EventQueue, RoomEventHandler, TransportClient,
    TransportConfig,
};
