//! Frame driver: clock and scheduler ports, the fixed-step loop, and the
//! solo and versus sessions that run inside it.

pub mod clock;
pub mod controls;
pub mod game_loop;
pub mod solo;
pub mod versus;

pub use versus_tetris_core as core;
pub use versus_tetris_input as input;
pub use versus_tetris_net as net;
pub use versus_tetris_scores as scores;
pub use versus_tetris_types as types;

pub use clock::{Clock, FrameId, FrameScheduler, ManualClock, ManualScheduler, SystemClock};
pub use controls::{apply_controls, ControlEffects, ControlPolicy};
pub use game_loop::{GameLoop, LoopCallbacks, MAX_FRAME_GAP_MS};
pub use solo::{NullRenderer, Renderer, SoloSession};
pub use versus::{MatchConfig, MatchPhase, Peer, Role, VersusMatch};
