//! Single-player session: input, engine, renderer, and the high-score table.

use tracing::{info, warn};

use crate::controls::{apply_controls, ControlPolicy};
use crate::core::{GameSnapshot, GameState};
use crate::game_loop::LoopCallbacks;
use crate::input::InputState;
use crate::net::OpponentSnapshot;
use crate::scores::{qualifies_as_high_score, ScoreStore, Submission, MAX_ENTRIES};
use crate::types::GameStatus;

/// Draws engine snapshots. Versus hooks default to no-ops.
pub trait Renderer {
    fn render(&mut self, snapshot: &GameSnapshot);

    fn render_opponent(&mut self, _opponent: &OpponentSnapshot) {}

    fn render_countdown(&mut self, _label: Option<&str>) {}
}

/// Discards every frame
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&mut self, _snapshot: &GameSnapshot) {}
}

pub struct SoloSession<S: ScoreStore, V: Renderer> {
    game: GameState,
    input: InputState,
    store: S,
    renderer: V,
    player_name: String,
    last_status: GameStatus,
    snapshot: GameSnapshot,
    last_submission: Option<Submission>,
}

impl<S: ScoreStore, V: Renderer> SoloSession<S, V> {
    pub fn new(seed: u32, store: S, renderer: V) -> Self {
        let game = GameState::new(seed);
        let last_status = game.status();
        let mut input = InputState::new();
        input.attach();
        Self {
            game,
            input,
            store,
            renderer,
            player_name: String::new(),
            last_status,
            snapshot: GameSnapshot::default(),
            last_submission: None,
        }
    }

    /// Name recorded with high scores (blank means "Anonymous")
    pub fn set_player_name(&mut self, name: &str) {
        self.player_name = name.to_string();
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn renderer(&self) -> &V {
        &self.renderer
    }

    /// Result of the most recent high-score submission
    pub fn last_submission(&self) -> Option<&Submission> {
        self.last_submission.as_ref()
    }

    fn on_game_over(&mut self) {
        let score = self.game.score();
        info!(score, level = self.game.level(), lines = self.game.lines(), "game over");

        let entries = match self.store.load_top_scores(MAX_ENTRIES) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to load high scores");
                return;
            }
        };
        if !qualifies_as_high_score(score, &entries) {
            return;
        }
        match self.store.submit_score(
            &self.player_name,
            score,
            Some(self.game.level()),
            Some(self.game.lines()),
        ) {
            Ok(sub) => {
                info!(rank = ?sub.rank, "high score recorded");
                self.last_submission = Some(sub);
            }
            Err(e) => warn!(error = %e, "failed to submit high score"),
        }
    }
}

impl<S: ScoreStore, V: Renderer> LoopCallbacks for SoloSession<S, V> {
    fn update(&mut self, step_ms: f64) {
        apply_controls(&mut self.input, &mut self.game, ControlPolicy::SOLO);
        self.game.tick(step_ms);

        let status = self.game.status();
        if status != self.last_status {
            if status == GameStatus::GameOver {
                self.on_game_over();
            }
            self.last_status = status;
        }
    }

    fn render(&mut self) {
        self.game.snapshot_into(&mut self.snapshot);
        self.renderer.render(&self.snapshot);
    }
}
