//! Terminal input module (engine-facing).
//!
//! Maps `crossterm` key events onto [`crate::types::GameAction`] through
//! rebindable [`KeyBindings`] and latches them in an [`InputState`] that the
//! fixed-step driver consumes once per action.

pub mod bindings;
pub mod state;

pub use versus_tetris_types as types;

pub use bindings::{KeyBindings, KeyList, MAX_KEYS_PER_ACTION};
pub use state::InputState;
