//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are pure data structures with no external dependencies, making them
//! usable in any context (simulation, input mapping, wire protocol).
//!
//! # Playfield Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 22 rows (indexed 0-21), the top 2 rows are a hidden spawn buffer
//! - **Spawn position**: (3, 0) with rotation 0
//!
//! # Timing Constants
//!
//! Timing values are in milliseconds:
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `FIXED_STEP_MS` | 16.67 | Simulation step (60 Hz) |
//! | `BASE_GRAVITY_MS` | 1000 | Gravity at level 1 |
//! | `GRAVITY_STEP_MS` | 80 | Gravity speed-up per level |
//! | `MIN_GRAVITY_MS` | 60 | Gravity floor |
//! | `LOCK_DELAY_MS` | 500 | Grace period for a grounded piece |
//!
//! # Examples
//!
//! ```
//! use versus_tetris_types::{PieceKind, Rotation, GameAction, FIELD_WIDTH, FIELD_HEIGHT};
//!
//! let parsed = PieceKind::from_str("t").unwrap();
//! assert_eq!(parsed, PieceKind::T);
//!
//! assert_eq!(Rotation::North.rotate_by(1), Rotation::East);
//! assert_eq!(Rotation::North.rotate_by(-1), Rotation::West);
//!
//! assert_eq!(GameAction::from_str("moveLeft"), Some(GameAction::MoveLeft));
//!
//! assert_eq!(FIELD_WIDTH, 10);
//! assert_eq!(FIELD_HEIGHT, 22);
//! ```

/// Playfield width in cells (10 columns)
pub const FIELD_WIDTH: u8 = 10;

/// Playfield height in cells, hidden buffer included (22 rows)
pub const FIELD_HEIGHT: u8 = 22;

/// Rows at the top of the playfield that are never rendered
pub const HIDDEN_ROWS: u8 = 2;

/// Spawn column of the 4x4 bounding box
pub const SPAWN_X: i8 = 3;

/// Spawn row of the 4x4 bounding box
pub const SPAWN_Y: i8 = 0;

/// Number of upcoming pieces kept in the preview queue
pub const QUEUE_LEN: usize = 5;

/// Fixed simulation step in milliseconds (60 Hz)
pub const FIXED_STEP_MS: f64 = 1000.0 / 60.0;

/// Gravity interval at level 1
pub const BASE_GRAVITY_MS: u32 = 1000;

/// Gravity speed-up per level
pub const GRAVITY_STEP_MS: u32 = 80;

/// Gravity never gets faster than this
pub const MIN_GRAVITY_MS: u32 = 60;

/// Lock delay once a piece rests on terrain
pub const LOCK_DELAY_MS: u32 = 500;

/// Lines needed per level
pub const LINES_PER_LEVEL: u32 = 10;

/// Line clear base scores indexed by rows cleared at once.
///
/// Multiplied by the level at clear time. More than 4 rows scores nothing.
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// The seven tetromino piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds, in the order a fresh bag is laid out before shuffling
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use versus_tetris_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// Uppercase letter, as used on the room wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::O => "O",
            PieceKind::T => "T",
            PieceKind::S => "S",
            PieceKind::Z => "Z",
            PieceKind::J => "J",
            PieceKind::L => "L",
        }
    }
}

/// Rotation states, numbered 0..=3 clockwise from the spawn orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Numeric rotation state (North = 0, East = 1, South = 2, West = 3)
    pub fn index(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Rotation state for any integer, taken modulo 4
    pub fn from_index(index: i32) -> Self {
        match index.rem_euclid(4) {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }

    /// Rotate by `direction` quarter turns (positive = clockwise)
    ///
    /// The target is `((current + direction) mod 4 + 4) mod 4`.
    pub fn rotate_by(&self, direction: i32) -> Self {
        Self::from_index(self.index() as i32 + direction.rem_euclid(4))
    }

    pub fn rotate_cw(&self) -> Self {
        self.rotate_by(1)
    }

    pub fn rotate_ccw(&self) -> Self {
        self.rotate_by(-1)
    }
}

/// Lifecycle status of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    Playing,
    Paused,
    GameOver,
    Menu,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Playing => "playing",
            GameStatus::Paused => "paused",
            GameStatus::GameOver => "gameover",
            GameStatus::Menu => "menu",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "playing" => Some(GameStatus::Playing),
            "paused" => Some(GameStatus::Paused),
            "gameover" => Some(GameStatus::GameOver),
            "menu" => Some(GameStatus::Menu),
            _ => None,
        }
    }
}

/// Logical player actions, independent of any physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down
    SoftDrop,
    /// Drop piece to its landing row and lock it
    HardDrop,
    /// Rotate piece 90° clockwise
    RotateCw,
    /// Rotate piece 90° counter-clockwise
    RotateCcw,
    /// Swap with the hold slot (once per piece)
    Hold,
    /// Toggle pause
    Pause,
    /// Start over with a fresh bag
    Restart,
}

impl GameAction {
    pub const ALL: [GameAction; 9] = [
        GameAction::MoveLeft,
        GameAction::MoveRight,
        GameAction::SoftDrop,
        GameAction::HardDrop,
        GameAction::RotateCw,
        GameAction::RotateCcw,
        GameAction::Hold,
        GameAction::Pause,
        GameAction::Restart,
    ];

    /// Dense index, stable across releases (used for per-action flag arrays)
    pub fn index(&self) -> usize {
        match self {
            GameAction::MoveLeft => 0,
            GameAction::MoveRight => 1,
            GameAction::SoftDrop => 2,
            GameAction::HardDrop => 3,
            GameAction::RotateCw => 4,
            GameAction::RotateCcw => 5,
            GameAction::Hold => 6,
            GameAction::Pause => 7,
            GameAction::Restart => 8,
        }
    }

    /// Parse action from its camelCase name (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "softdrop" => Some(GameAction::SoftDrop),
            "harddrop" => Some(GameAction::HardDrop),
            "rotatecw" => Some(GameAction::RotateCw),
            "rotateccw" => Some(GameAction::RotateCcw),
            "hold" => Some(GameAction::Hold),
            "pause" => Some(GameAction::Pause),
            "restart" => Some(GameAction::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::RotateCw => "rotateCw",
            GameAction::RotateCcw => "rotateCcw",
            GameAction::Hold => "hold",
            GameAction::Pause => "pause",
            GameAction::Restart => "restart",
        }
    }
}

/// Contents of a filled playfield cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    /// Left behind by a locked piece of this kind
    Piece(PieceKind),
    /// Injected by an opponent's attack
    Garbage,
}

impl From<PieceKind> for Block {
    fn from(kind: PieceKind) -> Self {
        Block::Piece(kind)
    }
}

/// A cell on the playfield
///
/// - `None`: Empty cell
/// - `Some(Block)`: Filled cell
pub type Cell = Option<Block>;
