//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the game rules, state management and simulation logic.
//! It has **zero dependencies** on rendering, networking, or I/O, making it:
//!
//! - **Deterministic**: the same seed produces the same piece sequence, which is
//!   how two versus opponents stay in step
//! - **Testable**: every rule is exercised by unit tests
//! - **Portable**: runs headless, in a terminal, or behind a relay
//!
//! # Module Structure
//!
//! - [`board`]: 10x22 playfield with collision, line clearing and garbage rows
//! - [`game_state`]: active piece, hold, queue, scoring and timers
//! - [`pieces`]: tetromino shapes and SRS wall kick tables
//! - [`rng`]: seeded LCG and 7-bag piece generation
//! - [`scoring`]: line clear points and the level/gravity curve
//! - [`snapshot`]: read-only view handed to renderers and the wire encoder
//!
//! # Game Rules
//!
//! - **7-Bag Randomizer**: every bag is a permutation of the seven kinds
//! - **SRS Rotation**: five kick candidates per transition; O rotates in place
//! - **Lock Delay**: 500ms on the ground; only a gravity fall resets it
//! - **Hold**: once per spawned piece
//! - **Scoring**: 100/300/500/800 times the level for 1-4 rows
//!
//! # Example
//!
//! ```
//! use versus_tetris_core::GameState;
//! use versus_tetris_core::types::GameStatus;
//!
//! let mut game = GameState::new(12345);
//! game.try_move(1, 0);
//! game.rotate(1);
//! game.hard_drop();
//! game.tick(1000.0 / 60.0);
//!
//! assert_eq!(game.status(), GameStatus::Playing);
//! ```
//!
//! # Timing
//!
//! Call [`GameState::tick`](game_state::GameState::tick) once per fixed step with
//! the elapsed milliseconds. Gravity starts at 1000ms per row and speeds up by
//! 80ms per level down to a 60ms floor.

pub mod board;
pub mod game_state;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use versus_tetris_types as types;

// Re-export commonly used types for convenience
pub use board::Board;
pub use game_state::{GameState, Tetromino};
pub use pieces::{get_shape, kick_offsets, shape_mask, try_rotate};
pub use rng::{BagRandomizer, SimpleRng};
pub use scoring::{calculate_score, gravity_ms_for_level, level_for_lines};
pub use snapshot::{ActiveSnapshot, GameSnapshot, TimersSnapshot};
