//! Game state module - manages the complete game state
//!
//! Ties the board, pieces, bag and scoring together and owns the timing rules:
//! gravity, the lock-delay state machine, line clears, speed updates and
//! garbage injection. Every operation either succeeds or returns `false`;
//! game over is a status, never a panic.

use std::collections::VecDeque;

use crate::board::Board;
use crate::pieces::{get_shape, try_rotate, PieceShape};
use crate::rng::{BagRandomizer, SimpleRng};
use crate::scoring::{calculate_score, gravity_ms_for_level, level_for_lines};
use crate::snapshot::{ActiveSnapshot, GameSnapshot, TimersSnapshot};
use crate::types::*;

/// Mixed into the game seed for the garbage gap RNG, so received garbage never
/// advances the piece sequence shared with an opponent.
const GARBAGE_SEED_SALT: u32 = 0x9E37_79B9;

/// Active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tetromino {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
}

impl Tetromino {
    /// Create a new tetromino at spawn position
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            rotation: Rotation::North,
            x: SPAWN_X,
            y: SPAWN_Y,
        }
    }

    /// Get the shape (mino offsets) for current rotation
    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    /// Absolute playfield coordinates of the minos
    pub fn cells(&self) -> [(i8, i8); 4] {
        self.shape().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Copy of this piece translated by (dx, dy), or None if the position
    /// leaves the `i8` range
    pub fn moved(&self, dx: i8, dy: i8) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
            ..*self
        })
    }
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    board: Board,
    active: Option<Tetromino>,
    hold: Option<PieceKind>,
    hold_locked: bool,
    queue: VecDeque<PieceKind>,
    bag: BagRandomizer,
    garbage_rng: SimpleRng,
    score: u32,
    level: u32,
    lines: u32,
    gravity_ms: u32,
    gravity_timer_ms: f64,
    lock_delay_ms: u32,
    lock_timer_ms: f64,
    status: GameStatus,
}

impl GameState {
    /// Create a running game: queue filled and the first piece spawned
    pub fn new(seed: u32) -> Self {
        let mut game = Self::fresh(seed, GameStatus::Playing);
        game.spawn_piece();
        game
    }

    /// A game waiting in the menu (used by versus rooms before the start signal).
    ///
    /// The queue is filled but no piece is active and `tick` does nothing.
    pub fn idle(seed: u32) -> Self {
        Self::fresh(seed, GameStatus::Menu)
    }

    fn fresh(seed: u32, status: GameStatus) -> Self {
        let mut game = Self {
            board: Board::new(),
            active: None,
            hold: None,
            hold_locked: false,
            queue: VecDeque::with_capacity(QUEUE_LEN + 1),
            bag: BagRandomizer::new(seed),
            garbage_rng: SimpleRng::new(seed ^ GARBAGE_SEED_SALT),
            score: 0,
            level: 1,
            lines: 0,
            gravity_ms: BASE_GRAVITY_MS,
            gravity_timer_ms: 0.0,
            lock_delay_ms: LOCK_DELAY_MS,
            lock_timer_ms: 0.0,
            status,
        };
        game.refill_queue();
        game
    }

    /// Start over with a seed derived from the current one (solo restarts)
    pub fn reset(&mut self) {
        let seed = self.bag.next_seed();
        *self = Self::new(seed);
    }

    /// Start over with a known seed, so peers sharing it see the same pieces
    pub fn reset_with_seed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }

    /// Flip between playing and paused; other statuses are left alone
    pub fn toggle_pause(&mut self) -> bool {
        self.status = match self.status {
            GameStatus::Playing => GameStatus::Paused,
            GameStatus::Paused => GameStatus::Playing,
            _ => return false,
        };
        true
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn seed(&self) -> u32 {
        self.bag.seed()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn gravity_ms(&self) -> u32 {
        self.gravity_ms
    }

    pub fn gravity_timer_ms(&self) -> f64 {
        self.gravity_timer_ms
    }

    pub fn lock_delay_ms(&self) -> u32 {
        self.lock_delay_ms
    }

    pub fn lock_timer_ms(&self) -> f64 {
        self.lock_timer_ms
    }

    pub fn hold_piece(&self) -> Option<PieceKind> {
        self.hold
    }

    pub fn hold_locked(&self) -> bool {
        self.hold_locked
    }

    pub fn queue(&self) -> &VecDeque<PieceKind> {
        &self.queue
    }

    pub fn active(&self) -> Option<Tetromino> {
        self.active
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        for (dst, src) in out.board.iter_mut().zip(self.board.rows()) {
            dst.copy_from_slice(src);
        }
        out.active = self.active.map(ActiveSnapshot::from);
        out.ghost_y = self.ghost_y();
        out.hold = self.hold;
        out.hold_locked = self.hold_locked;
        out.next_queue.clear();
        out.next_queue
            .extend(self.queue.iter().copied().take(QUEUE_LEN));
        out.status = self.status;
        out.seed = self.bag.seed();
        out.score = self.score;
        out.level = self.level;
        out.lines = self.lines;
        out.timers = TimersSnapshot {
            gravity_ms: self.gravity_ms,
            gravity_timer_ms: self.gravity_timer_ms,
            lock_delay_ms: self.lock_delay_ms,
            lock_timer_ms: self.lock_timer_ms,
        };
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut s = GameSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    fn refill_queue(&mut self) {
        while self.queue.len() < QUEUE_LEN {
            self.queue.push_back(self.bag.draw());
        }
    }

    /// Spawn the next queued piece.
    ///
    /// A blocked spawn position ends the game and leaves no active piece.
    fn spawn_piece(&mut self) -> bool {
        let Some(kind) = self.queue.pop_front() else {
            return false;
        };
        self.refill_queue();

        let piece = Tetromino::new(kind);
        if self.collides(&piece) {
            self.status = GameStatus::GameOver;
            self.active = None;
            return false;
        }

        self.active = Some(piece);
        self.hold_locked = false;
        true
    }

    /// Collision test against walls, floor and terrain
    pub fn collides(&self, piece: &Tetromino) -> bool {
        self.board.collides(&piece.shape(), piece.x, piece.y)
    }

    /// Check if the active piece is resting on the floor or terrain
    pub fn is_grounded(&self) -> bool {
        match self.active {
            Some(piece) => piece.moved(0, 1).map_or(true, |p| self.collides(&p)),
            None => false,
        }
    }

    /// Row the active piece would land on
    pub fn ghost_y(&self) -> Option<i8> {
        self.active.map(|piece| self.drop_y(&piece))
    }

    fn drop_y(&self, piece: &Tetromino) -> i8 {
        let mut landed = *piece;
        while let Some(next) = landed.moved(0, 1) {
            if self.collides(&next) {
                break;
            }
            landed = next;
        }
        landed.y
    }

    /// Translate the active piece; nothing changes when the target collides
    pub fn try_move(&mut self, dx: i8, dy: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let Some(next) = active.moved(dx, dy) else {
            return false;
        };
        if self.collides(&next) {
            return false;
        }
        self.active = Some(next);
        true
    }

    /// Rotate the active piece by `direction` quarter turns with wall kicks
    pub fn rotate(&mut self, direction: i32) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let result = try_rotate(
            active.kind,
            active.rotation,
            active.x,
            active.y,
            direction,
            |shape, x, y| self.board.collides(shape, x, y),
        );

        match result {
            Some((rotation, (dx, dy))) => {
                self.active = Some(Tetromino {
                    rotation,
                    x: active.x + dx,
                    y: active.y + dy,
                    ..active
                });
                true
            }
            None => false,
        }
    }

    /// Drop the active piece to its landing row and lock it
    pub fn hard_drop(&mut self) -> bool {
        let Some(active) = self.active else {
            return false;
        };

        let y = self.drop_y(&active);
        self.active = Some(Tetromino { y, ..active });
        self.settle();
        self.lock_timer_ms = 0.0;
        true
    }

    /// Swap the active piece with the hold slot (once per spawned piece)
    pub fn hold(&mut self) -> bool {
        if self.hold_locked {
            return false;
        }
        let Some(active) = self.active else {
            return false;
        };

        match self.hold.replace(active.kind) {
            None => {
                self.spawn_piece();
            }
            Some(held) => {
                let piece = Tetromino::new(held);
                if self.collides(&piece) {
                    self.status = GameStatus::GameOver;
                    self.active = None;
                } else {
                    self.active = Some(piece);
                }
            }
        }

        self.hold_locked = true;
        true
    }

    /// Advance timers by `dt_ms`. Returns true when a piece locked.
    ///
    /// Only a successful gravity fall resets the lock timer; sliding or
    /// rotating a grounded piece leaves it running.
    pub fn tick(&mut self, dt_ms: f64) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }

        self.gravity_timer_ms += dt_ms;
        let interval = f64::from(self.gravity_ms);
        let mut fell = false;
        while self.gravity_timer_ms >= interval {
            self.gravity_timer_ms -= interval;
            fell = self.try_move(0, 1) || fell;
        }

        if fell {
            self.lock_timer_ms = 0.0;
            return false;
        }

        if !self.is_grounded() {
            self.lock_timer_ms = 0.0;
            return false;
        }

        self.lock_timer_ms += dt_ms;
        if self.lock_timer_ms >= f64::from(self.lock_delay_ms) {
            self.settle();
            self.lock_timer_ms = 0.0;
            return true;
        }
        false
    }

    /// Lock, clear, update speed, spawn
    fn settle(&mut self) {
        self.lock_piece();
        self.clear_lines();
        self.update_speed();
        self.spawn_piece();
    }

    fn lock_piece(&mut self) {
        if let Some(active) = self.active.take() {
            self.board
                .lock_minos(&active.shape(), active.x, active.y, Block::Piece(active.kind));
        }
    }

    /// Remove full rows; score uses the level from before the speed update
    fn clear_lines(&mut self) -> u32 {
        let cleared = self.board.clear_full_rows();
        if cleared > 0 {
            self.lines += cleared;
            self.score += calculate_score(cleared, self.level);
        }
        cleared
    }

    fn update_speed(&mut self) {
        self.level = level_for_lines(self.lines);
        self.gravity_ms = gravity_ms_for_level(self.level);
    }

    /// Push `rows` garbage rows in from the bottom.
    ///
    /// Each row has one gap column drawn from the garbage RNG. Terrain pushed
    /// off the top ends the game; the active piece is lifted by the smallest
    /// amount (at most `rows`) that clears the new terrain, and ends the game
    /// when no such lift exists or any mino would sit above the field.
    pub fn add_garbage(&mut self, rows: u32) -> bool {
        if rows == 0 || self.status != GameStatus::Playing {
            return false;
        }

        let rows = rows.min(u32::from(FIELD_HEIGHT)) as usize;
        let rng = &mut self.garbage_rng;
        let overflow = self
            .board
            .push_garbage(rows, || rng.next_range(u32::from(FIELD_WIDTH)) as usize);

        if overflow {
            self.status = GameStatus::GameOver;
            self.active = None;
            return true;
        }

        if let Some(piece) = self.active {
            let lifted = (0..=rows as i8)
                .filter_map(|k| piece.moved(0, -k))
                .find(|candidate| !self.collides(candidate));

            match lifted {
                Some(p) if p.cells().iter().all(|&(_, y)| y >= 0) => self.active = Some(p),
                _ => {
                    self.status = GameStatus::GameOver;
                    self.active = None;
                }
            }
        }
        true
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const J: Block = Block::Piece(PieceKind::J);

    fn game_with_active(piece: Tetromino) -> GameState {
        let mut game = GameState::new(12345);
        game.active = Some(piece);
        game
    }

    fn filled_cells(game: &GameState) -> usize {
        game.board().cells().iter().filter(|c| c.is_some()).count()
    }

    #[test]
    fn test_new_game_state() {
        let game = GameState::new(12345);
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.level(), 1);
        assert_eq!(game.gravity_ms(), 1000);
        assert_eq!(game.lock_delay_ms(), 500);
        assert_eq!(game.queue().len(), QUEUE_LEN);
        let active = game.active().unwrap();
        assert_eq!((active.x, active.y, active.rotation), (3, 0, Rotation::North));
        assert!(!game.hold_locked());
    }

    #[test]
    fn test_idle_game_waits_in_menu() {
        let mut game = GameState::idle(7);
        assert_eq!(game.status(), GameStatus::Menu);
        assert!(game.active().is_none());
        assert!(!game.tick(5000.0));
        assert!(!game.toggle_pause());
        assert_eq!(game.status(), GameStatus::Menu);
    }

    #[test]
    fn test_try_move_rejects_walls_without_side_effect() {
        let mut game = game_with_active(Tetromino::new(PieceKind::T));
        for _ in 0..3 {
            assert!(game.try_move(-1, 0));
        }
        let before = game.active();
        assert!(!game.try_move(-1, 0));
        assert_eq!(game.active(), before);
    }

    #[test]
    fn test_extreme_deltas_are_rejected() {
        let mut game = game_with_active(Tetromino::new(PieceKind::T));
        let before = game.active();
        assert!(!game.try_move(i8::MAX, 0));
        assert!(!game.try_move(i8::MIN, 0));
        assert!(!game.try_move(0, i8::MAX));
        assert!(!game.try_move(i8::MAX, i8::MIN));
        assert_eq!(game.active(), before);
        assert_eq!(game.status(), GameStatus::Playing);

        assert!(game.rotate(i32::MAX));
        assert_eq!(game.active().unwrap().rotation, Rotation::West);
        assert!(game.rotate(i32::MIN));
        assert_eq!(game.active().unwrap().rotation, Rotation::West);
    }

    #[test]
    fn test_moved_reports_overflow() {
        let piece = Tetromino::new(PieceKind::I);
        assert!(piece.moved(i8::MAX, 0).is_none());
        assert!(piece.moved(0, i8::MIN).is_some());
        assert_eq!(piece.moved(1, 2).map(|p| (p.x, p.y)), Some((4, 2)));
    }

    #[test]
    fn test_o_piece_rotates_in_place() {
        let mut game = game_with_active(Tetromino::new(PieceKind::O));
        assert!(game.rotate(1));
        let active = game.active().unwrap();
        assert_eq!(active.rotation, Rotation::East);
        assert_eq!((active.x, active.y), (3, 0));
    }

    #[test]
    fn test_rotate_kicks_off_the_wall() {
        // Vertical I hugging the left wall cannot turn flat without a kick.
        let mut game = game_with_active(Tetromino {
            kind: PieceKind::I,
            rotation: Rotation::West,
            x: -1,
            y: 5,
        });
        assert!(game.rotate(1));
        let active = game.active().unwrap();
        assert_eq!(active.rotation, Rotation::North);
        assert!(active.cells().iter().all(|&(x, _)| x >= 0));
    }

    #[test]
    fn test_tetris_scores_800_at_level_one() {
        let mut game = game_with_active(Tetromino {
            kind: PieceKind::I,
            rotation: Rotation::East,
            x: 7,
            y: 0,
        });
        for y in 18..22 {
            game.board_mut().fill_row_except(y, &[9], J);
        }

        assert!(game.hard_drop());

        assert_eq!(game.score(), 800);
        assert_eq!(game.lines(), 4);
        assert_eq!(game.level(), 1);
        assert_eq!(filled_cells(&game), 0);
        for y in 0..4 {
            assert!(game.board().is_row_empty(y));
        }
    }

    #[test]
    fn test_clear_scores_with_level_before_speed_update() {
        let mut game = game_with_active(Tetromino {
            kind: PieceKind::I,
            rotation: Rotation::North,
            x: 0,
            y: 0,
        });
        game.lines = 9;
        game.board_mut().fill_row_except(21, &[0, 1, 2, 3], J);

        assert!(game.hard_drop());

        assert_eq!(game.score(), 100);
        assert_eq!(game.lines(), 10);
        assert_eq!(game.level(), 2);
        assert_eq!(game.gravity_ms(), 920);
    }

    #[test]
    fn test_gravity_moves_piece_down() {
        let mut game = GameState::new(1);
        let start_y = game.active().unwrap().y;

        game.tick(999.0);
        assert_eq!(game.active().unwrap().y, start_y);

        game.tick(1.0);
        assert_eq!(game.active().unwrap().y, start_y + 1);

        // A long frame applies every due gravity step.
        game.tick(3000.0);
        assert_eq!(game.active().unwrap().y, start_y + 4);
    }

    #[test]
    fn test_gravity_fall_resets_lock_timer() {
        let mut game = GameState::new(1);
        game.lock_timer_ms = 400.0;
        game.tick(1000.0);
        assert_eq!(game.lock_timer_ms(), 0.0);
    }

    #[test]
    fn test_lateral_move_does_not_reset_lock_timer() {
        let mut game = game_with_active(Tetromino {
            kind: PieceKind::T,
            rotation: Rotation::North,
            x: 4,
            y: 20,
        });
        assert!(game.is_grounded());

        assert!(!game.tick(300.0));
        assert_eq!(game.lock_timer_ms(), 300.0);

        assert!(game.try_move(-1, 0));
        assert!(game.try_move(1, 0));
        assert_eq!(game.lock_timer_ms(), 300.0);

        // 600ms grounded in total: locks even though the piece moved.
        assert!(game.tick(300.0));
        assert_eq!(filled_cells(&game), 4);
        assert_eq!(game.lock_timer_ms(), 0.0);
        assert_eq!(game.active().unwrap().y, SPAWN_Y);
    }

    #[test]
    fn test_airborne_piece_keeps_lock_timer_at_zero() {
        let mut game = GameState::new(3);
        game.tick(100.0);
        assert_eq!(game.lock_timer_ms(), 0.0);
    }

    #[test]
    fn test_game_over_only_at_spawn() {
        let mut game = GameState::new(42);
        // Every spawn shape touches row 1 between columns 3 and 6.
        for x in 3..7 {
            game.board_mut().set(x, 1, Some(J));
        }
        assert_eq!(game.status(), GameStatus::Playing);

        assert!(game.hard_drop());
        assert_eq!(game.status(), GameStatus::GameOver);
        assert!(game.active().is_none());

        let snapshot = game.snapshot();
        assert!(!game.hard_drop());
        assert!(!game.hold());
        assert!(!game.tick(5000.0));
        assert!(!game.add_garbage(3));
        assert_eq!(game.snapshot(), snapshot);
    }

    #[test]
    fn test_hold_stores_then_swaps_once_per_piece() {
        let mut game = GameState::new(9);
        let first = game.active().unwrap().kind;
        let second = game.queue()[0];

        assert!(game.hold());
        assert_eq!(game.hold_piece(), Some(first));
        assert_eq!(game.active().unwrap().kind, second);
        assert!(game.hold_locked());

        // Locked until the next spawn.
        assert!(!game.hold());

        game.board_mut().clear();
        assert!(game.hard_drop());
        assert!(!game.hold_locked());

        let third = game.active().unwrap().kind;
        game.try_move(1, 0);
        assert!(game.hold());
        assert_eq!(game.hold_piece(), Some(third));
        let swapped = game.active().unwrap();
        assert_eq!(swapped.kind, first);
        assert_eq!((swapped.x, swapped.y), (SPAWN_X, SPAWN_Y));
    }

    #[test]
    fn test_hold_swap_into_blocked_spawn_ends_game() {
        let mut game = GameState::new(9);
        assert!(game.hold());
        game.board_mut().clear();
        assert!(game.hard_drop());

        for x in 3..7 {
            game.board_mut().set(x, 1, Some(J));
        }
        assert!(game.hold());
        assert_eq!(game.status(), GameStatus::GameOver);
        assert!(game.active().is_none());
    }

    #[test]
    fn test_same_seed_same_pieces() {
        let mut host = GameState::new(777);
        let mut guest = GameState::idle(1);
        guest.reset_with_seed(777);

        for _ in 0..20 {
            assert_eq!(host.active().unwrap().kind, guest.active().unwrap().kind);
            assert_eq!(host.queue(), guest.queue());
            host.board_mut().clear();
            guest.board_mut().clear();
            host.hard_drop();
            guest.hard_drop();
        }
    }

    #[test]
    fn test_garbage_does_not_perturb_piece_sequence() {
        let mut a = GameState::new(5);
        let mut b = GameState::new(5);
        b.add_garbage(2);

        for _ in 0..10 {
            assert_eq!(a.active().unwrap().kind, b.active().unwrap().kind);
            a.board_mut().clear();
            b.board_mut().clear();
            a.hard_drop();
            b.hard_drop();
        }
    }

    #[test]
    fn test_add_garbage_raises_stack() {
        let mut game = GameState::new(11);
        game.board_mut().set(0, 21, Some(J));

        assert!(game.add_garbage(3));

        assert_eq!(game.status(), GameStatus::Playing);
        assert!(game.board().is_occupied(0, 18));
        assert_eq!(game.board().stack_height(), 4);
        for y in 19..22 {
            assert_eq!(
                (0..10).filter(|&x| game.board().is_occupied(x, y)).count(),
                9
            );
        }
    }

    #[test]
    fn test_add_garbage_lifts_overlapping_piece() {
        let mut game = game_with_active(Tetromino {
            kind: PieceKind::O,
            rotation: Rotation::North,
            x: 3,
            y: 20,
        });

        assert!(game.add_garbage(2));

        assert_eq!(game.status(), GameStatus::Playing);
        let active = game.active().unwrap();
        assert!(active.y <= 18);
        assert!(!game.collides(&active));
    }

    #[test]
    fn test_add_garbage_overflow_ends_game() {
        let mut game = GameState::new(11);
        game.board_mut().set(0, 1, Some(J));

        assert!(game.add_garbage(2));
        assert_eq!(game.status(), GameStatus::GameOver);
        assert!(game.active().is_none());
    }

    #[test]
    fn test_add_garbage_ignored_while_paused() {
        let mut game = GameState::new(11);
        assert!(game.toggle_pause());
        assert!(!game.add_garbage(4));
        assert_eq!(game.board().stack_height(), 0);
        assert!(game.toggle_pause());
        assert_eq!(game.status(), GameStatus::Playing);
    }

    #[test]
    fn test_reset_starts_fresh() {
        let mut game = GameState::new(3);
        game.board_mut().fill_row_except(21, &[0], J);
        game.score = 1234;
        game.reset();

        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.score(), 0);
        assert_eq!(filled_cells(&game), 0);
        assert!(game.active().is_some());
    }

    #[test]
    fn test_snapshot_reports_ghost_and_queue() {
        let game = GameState::new(31);
        let snapshot = game.snapshot();
        assert_eq!(snapshot.next_queue.len(), QUEUE_LEN);
        assert!(snapshot.ghost_y.unwrap() >= snapshot.active.unwrap().y);
        assert_eq!(snapshot.seed, 31);
        assert!(snapshot.playable());
        assert_eq!(snapshot.visible_rows().len(), 20);
    }
}
