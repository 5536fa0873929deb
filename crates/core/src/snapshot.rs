use arrayvec::ArrayVec;

use crate::game_state::Tetromino;
use crate::types::{Cell, GameStatus, PieceKind, Rotation, FIELD_HEIGHT, FIELD_WIDTH, HIDDEN_ROWS, QUEUE_LEN};

pub type SnapshotBoard = [[Cell; FIELD_WIDTH as usize]; FIELD_HEIGHT as usize];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
    /// Absolute playfield coordinates of the four minos
    pub cells: [(i8, i8); 4],
}

impl From<Tetromino> for ActiveSnapshot {
    fn from(value: Tetromino) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            x: value.x,
            y: value.y,
            cells: value.cells(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimersSnapshot {
    pub gravity_ms: u32,
    pub gravity_timer_ms: f64,
    pub lock_delay_ms: u32,
    pub lock_timer_ms: f64,
}

/// Read-only view of a game handed to renderers and the wire encoder
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub board: SnapshotBoard,
    pub active: Option<ActiveSnapshot>,
    pub ghost_y: Option<i8>,
    pub hold: Option<PieceKind>,
    pub hold_locked: bool,
    pub next_queue: ArrayVec<PieceKind, QUEUE_LEN>,
    pub status: GameStatus,
    pub seed: u32,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub timers: TimersSnapshot,
}

impl GameSnapshot {
    pub fn clear(&mut self) {
        self.board = [[None; FIELD_WIDTH as usize]; FIELD_HEIGHT as usize];
        self.active = None;
        self.ghost_y = None;
        self.hold = None;
        self.hold_locked = false;
        self.next_queue.clear();
        self.status = GameStatus::Menu;
        self.seed = 0;
        self.score = 0;
        self.level = 1;
        self.lines = 0;
        self.timers = TimersSnapshot {
            gravity_ms: 0,
            gravity_timer_ms: 0.0,
            lock_delay_ms: 0,
            lock_timer_ms: 0.0,
        };
    }

    pub fn playable(&self) -> bool {
        self.status == GameStatus::Playing
    }

    /// Rows a renderer should draw (the spawn buffer is skipped)
    pub fn visible_rows(&self) -> &[[Cell; FIELD_WIDTH as usize]] {
        &self.board[HIDDEN_ROWS as usize..]
    }

    /// 0/1 occupancy grid, as sent to an opponent
    pub fn occupancy(&self) -> Vec<Vec<u8>> {
        self.board
            .iter()
            .map(|row| row.iter().map(|cell| cell.is_some() as u8).collect())
            .collect()
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        let mut s = Self {
            board: [[None; FIELD_WIDTH as usize]; FIELD_HEIGHT as usize],
            active: None,
            ghost_y: None,
            hold: None,
            hold_locked: false,
            next_queue: ArrayVec::new(),
            status: GameStatus::Menu,
            seed: 0,
            score: 0,
            level: 1,
            lines: 0,
            timers: TimersSnapshot {
                gravity_ms: 0,
                gravity_timer_ms: 0.0,
                lock_delay_ms: 0,
                lock_timer_ms: 0.0,
            },
        };
        s.clear();
        s
    }
}
