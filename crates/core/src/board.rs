//! Board module - manages the playfield grid
//!
//! The playfield is a 10x22 grid where each cell can be empty or filled.
//! Uses a flat array for cache locality and zero-allocation updates.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..21 (top to bottom).
//! Rows 0 and 1 are the hidden spawn buffer; they collide and clear like any other row.

use crate::types::{Block, Cell, FIELD_HEIGHT, FIELD_WIDTH};

/// Total number of cells on the board
const BOARD_SIZE: usize = (FIELD_WIDTH as usize) * (FIELD_HEIGHT as usize);

const WIDTH: usize = FIELD_WIDTH as usize;
const HEIGHT: usize = FIELD_HEIGHT as usize;

/// The playfield - 10 columns x 22 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= FIELD_WIDTH as i8 || y < 0 || y >= FIELD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * WIDTH + (x as usize))
    }

    pub fn width(&self) -> u8 {
        FIELD_WIDTH
    }

    pub fn height(&self) -> u8 {
        FIELD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Collision test for a set of mino offsets placed at (x, y).
    ///
    /// A mino collides when it is left/right of the walls, at or below the floor,
    /// or on a filled cell. Minos above the top edge (negative y) only collide
    /// with the walls.
    pub fn collides(&self, minos: &[(i8, i8)], x: i8, y: i8) -> bool {
        minos.iter().any(|&(dx, dy)| {
            let px = i16::from(x) + i16::from(dx);
            let py = i16::from(y) + i16::from(dy);
            if px < 0 || px >= i16::from(FIELD_WIDTH) || py >= i16::from(FIELD_HEIGHT) {
                return true;
            }
            py >= 0 && self.is_occupied(px as i8, py as i8)
        })
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= HEIGHT {
            return false;
        }
        let start = y * WIDTH;
        self.cells[start..start + WIDTH].iter().all(|cell| cell.is_some())
    }

    /// Check if a row has no filled cell
    pub fn is_row_empty(&self, y: usize) -> bool {
        if y >= HEIGHT {
            return true;
        }
        let start = y * WIDTH;
        self.cells[start..start + WIDTH].iter().all(|cell| cell.is_none())
    }

    /// Remove row `y`, shifting every row above it down by one and leaving an
    /// empty row at the top.
    fn remove_row(&mut self, y: usize) {
        // copy_within handles the overlapping ranges
        self.cells.copy_within(0..y * WIDTH, WIDTH);
        for cell in &mut self.cells[0..WIDTH] {
            *cell = None;
        }
    }

    /// Clear all full rows and return how many were removed.
    ///
    /// Scans bottom to top. After a removal the same index is examined again,
    /// since the row above has just shifted into it.
    pub fn clear_full_rows(&mut self) -> u32 {
        let mut cleared = 0;
        let mut y = HEIGHT;
        while y > 0 {
            let row = y - 1;
            if self.is_row_full(row) {
                self.remove_row(row);
                cleared += 1;
            } else {
                y -= 1;
            }
        }
        cleared
    }

    /// Write a piece's minos into the grid.
    ///
    /// Minos outside the grid (including the rows above the top edge) are skipped.
    pub fn lock_minos(&mut self, minos: &[(i8, i8)], x: i8, y: i8, block: Block) {
        for &(dx, dy) in minos {
            self.set(x + dx, y + dy, Some(block));
        }
    }

    /// Push `rows` garbage rows in from the bottom.
    ///
    /// Each new row is full except for the column returned by `gap` (taken modulo
    /// the width). Existing rows move up by `rows`. Returns `true` when filled
    /// cells were pushed off the top of the grid.
    pub fn push_garbage(&mut self, rows: usize, mut gap: impl FnMut() -> usize) -> bool {
        let rows = rows.min(HEIGHT);
        if rows == 0 {
            return false;
        }

        let overflow = (0..rows).any(|y| !self.is_row_empty(y));

        self.cells.copy_within(rows * WIDTH..BOARD_SIZE, 0);
        for y in HEIGHT - rows..HEIGHT {
            let hole = gap() % WIDTH;
            let start = y * WIDTH;
            for (x, cell) in self.cells[start..start + WIDTH].iter_mut().enumerate() {
                *cell = if x == hole { None } else { Some(Block::Garbage) };
            }
        }

        overflow
    }

    /// Height of the stack: rows from the floor up to the highest filled cell
    pub fn stack_height(&self) -> u8 {
        (0..HEIGHT)
            .find(|&y| !self.is_row_empty(y))
            .map(|y| (HEIGHT - y) as u8)
            .unwrap_or(0)
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Iterate over the grid one row at a time, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(WIDTH)
    }

    /// Clear the entire board
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            *cell = None;
        }
    }

    /// Fill row `y` except for the listed columns.
    pub fn fill_row_except(&mut self, y: i8, holes: &[i8], block: Block) {
        for x in 0..FIELD_WIDTH as i8 {
            if !holes.contains(&x) {
                self.set(x, y, Some(block));
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PieceKind;

    const T: Block = Block::Piece(PieceKind::T);

    #[test]
    fn test_board_index_calculation() {
        assert_eq!(Board::index(0, 0), Some(0));
        assert_eq!(Board::index(9, 0), Some(9));
        assert_eq!(Board::index(0, 1), Some(10));
        assert_eq!(Board::index(9, 21), Some(219));
        assert_eq!(Board::index(-1, 0), None);
        assert_eq!(Board::index(10, 0), None);
        assert_eq!(Board::index(0, 22), None);
    }

    #[test]
    fn test_collides_bounds_and_terrain() {
        let mut board = Board::new();
        let single = [(0, 0)];

        assert!(!board.collides(&single, 0, 0));
        assert!(board.collides(&single, -1, 0));
        assert!(board.collides(&single, 10, 0));
        assert!(board.collides(&single, 0, 22));

        // Above the top edge only the walls matter.
        assert!(!board.collides(&single, 4, -3));
        assert!(board.collides(&single, -1, -3));

        board.set(4, 10, Some(T));
        assert!(board.collides(&single, 4, 10));
        assert!(!board.collides(&single, 5, 10));
    }

    #[test]
    fn test_clear_full_rows_rechecks_same_index() {
        let mut board = Board::new();
        board.fill_row_except(21, &[], T);
        board.fill_row_except(20, &[], T);
        board.set(2, 19, Some(T));

        assert_eq!(board.clear_full_rows(), 2);
        assert!(board.is_occupied(2, 21));
        assert!(board.is_row_empty(0));
        assert!(board.is_row_empty(1));
        assert_eq!(board.stack_height(), 1);
    }

    #[test]
    fn test_clear_full_rows_noop_without_full_rows() {
        let mut board = Board::new();
        board.fill_row_except(21, &[5], T);
        board.set(0, 3, Some(T));
        let before = board.clone();

        assert_eq!(board.clear_full_rows(), 0);
        assert_eq!(board, before);
    }

    #[test]
    fn test_lock_minos_skips_out_of_range() {
        let mut board = Board::new();
        board.lock_minos(&[(0, 0), (0, 1), (0, 2)], 1, -1, T);

        assert!(board.is_occupied(1, 0));
        assert!(board.is_occupied(1, 1));
        assert_eq!(board.cells().iter().filter(|c| c.is_some()).count(), 2);
    }

    #[test]
    fn test_push_garbage_shifts_up_with_one_gap() {
        let mut board = Board::new();
        board.set(0, 21, Some(T));

        let overflow = board.push_garbage(2, || 7);

        assert!(!overflow);
        assert!(board.is_occupied(0, 19));
        for y in [20, 21] {
            assert!(!board.is_occupied(7, y));
            assert_eq!((0..10).filter(|&x| board.is_occupied(x, y)).count(), 9);
        }
        assert_eq!(board.stack_height(), 3);
    }

    #[test]
    fn test_push_garbage_reports_overflow() {
        let mut board = Board::new();
        board.set(3, 0, Some(T));

        assert!(board.push_garbage(1, || 0));
    }
}
