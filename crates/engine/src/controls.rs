//! Latched input applied to the engine once per step.

use crate::core::GameState;
use crate::input::InputState;
use crate::types::{GameAction, GameStatus};

/// Which meta actions a session honors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlPolicy {
    pub allow_pause: bool,
    pub allow_restart: bool,
}

impl ControlPolicy {
    pub const SOLO: Self = Self {
        allow_pause: true,
        allow_restart: true,
    };

    /// A shared seed and a live opponent rule out both
    pub const VERSUS: Self = Self {
        allow_pause: false,
        allow_restart: false,
    };
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlEffects {
    pub pause_toggled: bool,
    pub restarted: bool,
}

/// Apply one step of input.
///
/// Pause and restart go first. Movement is only consumed while playing, so
/// it stays latched across a pause.
pub fn apply_controls(
    input: &mut InputState,
    game: &mut GameState,
    policy: ControlPolicy,
) -> ControlEffects {
    let mut effects = ControlEffects::default();

    if input.consume(GameAction::Pause) && policy.allow_pause {
        effects.pause_toggled = game.toggle_pause();
    }
    if input.consume(GameAction::Restart) && policy.allow_restart {
        game.reset();
        effects.restarted = true;
    }
    if game.status() != GameStatus::Playing {
        return effects;
    }

    let left = input.consume(GameAction::MoveLeft);
    let right = input.consume(GameAction::MoveRight);
    if left {
        game.try_move(-1, 0);
    }
    if right {
        game.try_move(1, 0);
    }

    if input.consume(GameAction::SoftDrop) {
        game.try_move(0, 1);
    }

    if input.consume(GameAction::RotateCw) {
        game.rotate(1);
    }
    if input.consume(GameAction::RotateCcw) {
        game.rotate(-1);
    }

    if input.consume(GameAction::HardDrop) {
        game.hard_drop();
    }

    if input.consume(GameAction::Hold) {
        game.hold();
    }

    effects
}
