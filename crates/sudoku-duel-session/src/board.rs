//! The shared grid a session plays on.
//!
//! `Board` is the mutable counterpart of [`BoardSnapshot`]: a dense
//! `size * size` grid that answers "may I put this value here?" for local
//! moves and accepts a peer's moves without asking.

use sudoku_duel_protocol::{BoardSnapshot, ProtocolError, Square};

use crate::MoveError;

/// Contents of one filled square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub value: u32,
    /// A puzzle clue that players cannot change.
    pub fixed: bool,
}

/// A dense puzzle grid.
///
/// Coordinates follow the wire: `x` is the column, `y` the row, both
/// 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: u32,
    block: u32,
    /// Row-major: index `y * size + x`.
    cells: Vec<Option<Entry>>,
}

impl Board {
    /// An empty board of the given size.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidBoard`] if `size` is not a perfect
    /// square or exceeds the board size limit.
    pub fn new(size: u32) -> Result<Self, ProtocolError> {
        Self::from_snapshot(&BoardSnapshot::empty(size)?)
    }

    /// Expands a snapshot into a grid.
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Result<Self, ProtocolError> {
        let size = snapshot.size();
        let n = size as usize;
        let mut board = Self {
            size,
            block: snapshot.block_size(),
            cells: vec![None; n * n],
        };
        for sq in snapshot.squares() {
            // Snapshots guarantee in-range coordinates.
            let idx = board.index(sq.x, sq.y).ok_or_else(|| {
                ProtocolError::InvalidBoard(format!(
                    "square ({}, {}) is outside the grid",
                    sq.x, sq.y
                ))
            })?;
            board.cells[idx] = Some(Entry {
                value: sq.value,
                fixed: sq.fixed,
            });
        }
        Ok(board)
    }

    /// Flattens the grid back into its wire form, row by row.
    ///
    /// # Errors
    /// Only fails if the grid no longer has a shape a snapshot can carry.
    pub fn snapshot(&self) -> Result<BoardSnapshot, ProtocolError> {
        let squares = self
            .cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| {
                let entry = (*cell)?;
                let idx = idx as u32;
                Some(Square {
                    x: idx % self.size,
                    y: idx / self.size,
                    value: entry.value,
                    fixed: entry.fixed,
                })
            })
            .collect();
        // Values are either checked local moves or trusted peer values.
        BoardSnapshot::from_peer(self.size, squares)
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Side length of one sub-block.
    pub fn block_size(&self) -> u32 {
        self.block
    }

    /// The square at `(x, y)`, or `None` if empty or off the board.
    pub fn get(&self, x: u32, y: u32) -> Option<Entry> {
        self.index(x, y).and_then(|idx| self.cells[idx])
    }

    /// Number of squares without a value.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// `true` when every square holds a value. Says nothing about whether
    /// the values are correct.
    pub fn is_full(&self) -> bool {
        self.empty_count() == 0
    }

    /// Checks a local move against the board rules without applying it.
    ///
    /// The target square itself is ignored when looking for conflicts, so
    /// overwriting a square with its own value is allowed.
    pub fn check_move(&self, x: u32, y: u32, value: u32) -> Result<(), MoveError> {
        let size = self.size;
        let idx = self
            .index(x, y)
            .ok_or(MoveError::OutOfBounds { x, y, size })?;
        if value == 0 || value > size {
            return Err(MoveError::ValueOutOfRange { value, size });
        }
        if self.cells[idx].is_some_and(|e| e.fixed) {
            return Err(MoveError::FixedSquare { x, y });
        }

        let holds = |cx: u32, cy: u32| {
            (cx, cy) != (x, y)
                && self.get(cx, cy).is_some_and(|e| e.value == value)
        };

        if (0..size).any(|cx| holds(cx, y)) {
            return Err(MoveError::RowConflict { y, value });
        }
        if (0..size).any(|cy| holds(x, cy)) {
            return Err(MoveError::ColumnConflict { x, value });
        }
        let (bx, by) = (x - x % self.block, y - y % self.block);
        let in_block = (by..by + self.block)
            .any(|cy| (bx..bx + self.block).any(|cx| holds(cx, cy)));
        if in_block {
            return Err(MoveError::BlockConflict { x, y, value });
        }
        Ok(())
    }

    /// Validates and applies a local move.
    pub fn fill(&mut self, x: u32, y: u32, value: u32) -> Result<(), MoveError> {
        self.check_move(x, y, value)?;
        self.set(x, y, value);
        Ok(())
    }

    /// Empties a square a player filled.
    pub fn clear(&mut self, x: u32, y: u32) -> Result<(), MoveError> {
        let size = self.size;
        let idx = self
            .index(x, y)
            .ok_or(MoveError::OutOfBounds { x, y, size })?;
        if self.cells[idx].is_some_and(|e| e.fixed) {
            return Err(MoveError::FixedSquare { x, y });
        }
        self.cells[idx] = None;
        Ok(())
    }

    /// Applies a peer's move without checking the rules. `0` clears the
    /// square. Returns `false`, changing nothing, if `(x, y)` is off the
    /// board.
    pub fn apply_remote(&mut self, x: u32, y: u32, value: u32) -> bool {
        if self.index(x, y).is_none() {
            return false;
        }
        self.set(x, y, value);
        true
    }

    /// Writes a player value; `0` empties the square.
    fn set(&mut self, x: u32, y: u32, value: u32) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = (value != 0).then_some(Entry {
                value,
                fixed: false,
            });
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size && y < self.size)
            .then(|| y as usize * self.size as usize + x as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ```text
    /// 1 . | . .
    /// . . | . 3
    /// ----+----
    /// . . | . .
    /// . 4 | . .
    /// ```
    fn sample() -> Board {
        let snap = BoardSnapshot::new(
            4,
            vec![
                Square::clue(0, 0, 1),
                Square::clue(3, 1, 3),
                Square::entry(1, 3, 4),
            ],
        )
        .unwrap();
        Board::from_snapshot(&snap).unwrap()
    }

    // =====================================================================
    // Construction and snapshots
    // =====================================================================

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::new(9).unwrap();
        assert_eq!(board.size(), 9);
        assert_eq!(board.block_size(), 3);
        assert_eq!(board.empty_count(), 81);
        assert!(!board.is_full());
    }

    #[test]
    fn test_new_rejects_non_square_size() {
        assert!(Board::new(5).is_err());
    }

    #[test]
    fn test_from_snapshot_places_squares_by_column_and_row() {
        let board = sample();
        assert_eq!(board.get(0, 0), Some(Entry { value: 1, fixed: true }));
        assert_eq!(board.get(3, 1), Some(Entry { value: 3, fixed: true }));
        assert_eq!(board.get(1, 3), Some(Entry { value: 4, fixed: false }));
        assert_eq!(board.get(1, 0), None);
        assert_eq!(board.get(9, 9), None);
        assert_eq!(board.empty_count(), 13);
    }

    #[test]
    fn test_snapshot_round_trips_through_board() {
        let board = sample();
        let again = Board::from_snapshot(&board.snapshot().unwrap()).unwrap();
        assert_eq!(again, board);
    }

    #[test]
    fn test_snapshot_keeps_peer_values_above_size() {
        let snap = BoardSnapshot::from_peer(4, vec![Square::clue(2, 2, 7)]).unwrap();
        let board = Board::from_snapshot(&snap).unwrap();
        assert_eq!(board.snapshot().unwrap().squares()[0].value, 7);
    }

    #[test]
    fn test_snapshot_after_trusted_remote_fill_is_ok() {
        let mut board = sample();
        assert!(board.apply_remote(1, 0, 9));
        let snap = board.snapshot().unwrap();
        assert!(snap.squares().contains(&Square::entry(1, 0, 9)));
    }

    // =====================================================================
    // check_move
    // =====================================================================

    #[test]
    fn test_check_move_accepts_legal_value() {
        assert_eq!(sample().check_move(2, 0, 2), Ok(()));
    }

    #[test]
    fn test_check_move_out_of_bounds() {
        assert_eq!(
            sample().check_move(4, 0, 1),
            Err(MoveError::OutOfBounds { x: 4, y: 0, size: 4 })
        );
    }

    #[test]
    fn test_check_move_value_out_of_range() {
        let board = sample();
        assert_eq!(
            board.check_move(1, 1, 0),
            Err(MoveError::ValueOutOfRange { value: 0, size: 4 })
        );
        assert_eq!(
            board.check_move(1, 1, 5),
            Err(MoveError::ValueOutOfRange { value: 5, size: 4 })
        );
    }

    #[test]
    fn test_check_move_fixed_square() {
        assert_eq!(
            sample().check_move(0, 0, 2),
            Err(MoveError::FixedSquare { x: 0, y: 0 })
        );
    }

    #[test]
    fn test_check_move_row_conflict() {
        // Row 1 holds a 3 at column 3.
        assert_eq!(
            sample().check_move(2, 1, 3),
            Err(MoveError::RowConflict { y: 1, value: 3 })
        );
    }

    #[test]
    fn test_check_move_column_conflict() {
        // Column 1 holds a 4 at row 3.
        assert_eq!(
            sample().check_move(1, 0, 4),
            Err(MoveError::ColumnConflict { x: 1, value: 4 })
        );
    }

    #[test]
    fn test_check_move_block_conflict() {
        // Top-left block holds a 1 at (0, 0); (1, 1) shares neither its row
        // nor its column.
        assert_eq!(
            sample().check_move(1, 1, 1),
            Err(MoveError::BlockConflict { x: 1, y: 1, value: 1 })
        );
    }

    #[test]
    fn test_check_move_ignores_target_square() {
        // Re-entering the value already in a player square is not a conflict.
        assert_eq!(sample().check_move(1, 3, 4), Ok(()));
    }

    // =====================================================================
    // Mutation
    // =====================================================================

    #[test]
    fn test_fill_applies_only_legal_moves() {
        let mut board = sample();
        board.fill(2, 0, 2).unwrap();
        assert_eq!(board.get(2, 0), Some(Entry { value: 2, fixed: false }));

        assert!(board.fill(3, 0, 2).is_err());
        assert_eq!(board.get(3, 0), None);
    }

    #[test]
    fn test_clear_empties_player_square_only() {
        let mut board = sample();
        board.clear(1, 3).unwrap();
        assert_eq!(board.get(1, 3), None);

        assert_eq!(
            board.clear(0, 0),
            Err(MoveError::FixedSquare { x: 0, y: 0 })
        );
    }

    #[test]
    fn test_apply_remote_skips_rules_but_not_bounds() {
        let mut board = sample();
        // Conflicts with the 3 in row 1; a peer's move is trusted anyway.
        assert!(board.apply_remote(2, 1, 3));
        assert_eq!(board.get(2, 1).map(|e| e.value), Some(3));

        assert!(!board.apply_remote(4, 4, 1));
    }

    #[test]
    fn test_apply_remote_zero_clears() {
        let mut board = sample();
        assert!(board.apply_remote(1, 3, 0));
        assert_eq!(board.get(1, 3), None);
    }

    #[test]
    fn test_is_full_after_filling_every_square() {
        let mut board = Board::new(1).unwrap();
        board.fill(0, 0, 1).unwrap();
        assert!(board.is_full());
    }
}
