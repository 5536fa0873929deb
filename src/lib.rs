//! Versus Tetris (workspace facade crate).
//!
//! Re-exports the workspace crates as `versus_tetris::{core,engine,input,net,scores,types}`
//! while the implementation lives in dedicated crates under `crates/`.

pub use versus_tetris_core as core;
pub use versus_tetris_engine as engine;
pub use versus_tetris_input as input;
pub use versus_tetris_net as net;
pub use versus_tetris_scores as scores;
pub use versus_tetris_types as types;
