//! Core protocol types: the values that travel as one line on the wire.
//!
//! A frame is `<header>:<body>`. The header names the [`Message`] kind and
//! the body is a comma-separated list of unsigned integers. Boards travel as
//! a [`BoardSnapshot`]: a size followed by the non-empty squares, four fields
//! per square.

use std::collections::HashSet;
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Literal header tokens, including the `:` separator.
pub mod header {
    pub const JOIN: &str = "join:";
    pub const JOIN_ACK: &str = "join_ack:";
    pub const NEW: &str = "new:";
    pub const NEW_ACK: &str = "new_ack:";
    pub const FILL: &str = "fill:";
    pub const FILL_ACK: &str = "fill_ack:";
    pub const QUIT: &str = "quit:";

    /// Every header, longest first, so that prefix matching always picks
    /// the most specific one (`join_ack:` before `join:`).
    pub const ALL: [&str; 7] =
        [JOIN_ACK, FILL_ACK, NEW_ACK, JOIN, FILL, QUIT, NEW];
}

// ---------------------------------------------------------------------------
// Square
// ---------------------------------------------------------------------------

/// One non-empty square of a board.
///
/// `x` is the 0-based column and `y` the 0-based row. `fixed` marks a clue
/// given by the puzzle, as opposed to a value a player entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Square {
    pub x: u32,
    pub y: u32,
    pub value: u32,
    pub fixed: bool,
}

impl Square {
    /// A puzzle-given clue.
    pub fn clue(x: u32, y: u32, value: u32) -> Self {
        Self { x, y, value, fixed: true }
    }

    /// A player-entered value.
    pub fn entry(x: u32, y: u32, value: u32) -> Self {
        Self { x, y, value, fixed: false }
    }
}

// ---------------------------------------------------------------------------
// BoardSnapshot
// ---------------------------------------------------------------------------

/// Largest board side accepted, on the wire or locally.
pub const MAX_BOARD_SIZE: u32 = 100;

/// Returns the side length of a sub-block for a board of `size`, or `None`
/// if `size` is zero or not a perfect square.
///
/// ```
/// use sudoku_duel_protocol::block_size;
///
/// assert_eq!(block_size(9), Some(3));
/// assert_eq!(block_size(4), Some(2));
/// assert_eq!(block_size(6), None);
/// ```
pub fn block_size(size: u32) -> Option<u32> {
    if size == 0 {
        return None;
    }
    let root = (size as f64).sqrt().round() as u32;
    (root.checked_mul(root) == Some(size)).then_some(root)
}

/// The wire representation of a puzzle: its size plus every non-empty
/// square.
///
/// Every snapshot satisfies the structural invariants peers rely on to
/// index a grid safely:
///
/// - `size` is a perfect square no larger than [`MAX_BOARD_SIZE`] (the
///   grid splits into equal sub-blocks)
/// - every `x` and `y` is in `0..size`
/// - every `value` is non-zero (empty squares are simply not listed)
/// - no two squares share the same `(x, y)`
///
/// Boards built locally with [`BoardSnapshot::new`] additionally keep every
/// value in `1..=size`. Boards decoded from a peer skip that last check:
/// their values are trusted the same way a peer's fills are. Whether the
/// puzzle is solvable, or even consistent, is never checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    size: u32,
    squares: Vec<Square>,
}

impl BoardSnapshot {
    /// Builds a snapshot, validating every invariant including the value
    /// range.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidBoard`] describing the first
    /// violated invariant.
    pub fn new(
        size: u32,
        squares: Vec<Square>,
    ) -> Result<Self, ProtocolError> {
        check_squares(size, &squares, Some(size))?;
        Ok(Self { size, squares })
    }

    /// Builds a snapshot whose values come from a peer. Structural
    /// invariants are enforced; the value upper bound is not.
    pub fn from_peer(
        size: u32,
        squares: Vec<Square>,
    ) -> Result<Self, ProtocolError> {
        check_squares(size, &squares, None)?;
        Ok(Self { size, squares })
    }

    /// A board of the given size with no squares filled.
    pub fn empty(size: u32) -> Result<Self, ProtocolError> {
        Self::new(size, Vec::new())
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Side length of one sub-block.
    pub fn block_size(&self) -> u32 {
        // Validated in `new`.
        block_size(self.size).unwrap_or(1)
    }

    /// Non-empty squares, in the order they were listed.
    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    /// Consumes the snapshot, returning its squares.
    pub fn into_squares(self) -> Vec<Square> {
        self.squares
    }
}

fn check_squares(
    size: u32,
    squares: &[Square],
    max_value: Option<u32>,
) -> Result<(), ProtocolError> {
    if block_size(size).is_none() {
        return Err(ProtocolError::InvalidBoard(format!(
            "size {size} is not a positive perfect square"
        )));
    }
    if size > MAX_BOARD_SIZE {
        return Err(ProtocolError::InvalidBoard(format!(
            "size {size} exceeds {MAX_BOARD_SIZE}"
        )));
    }

    let mut seen = HashSet::with_capacity(squares.len());
    for sq in squares {
        if sq.x >= size || sq.y >= size {
            return Err(ProtocolError::InvalidBoard(format!(
                "square ({}, {}) is outside a {size}x{size} grid",
                sq.x, sq.y
            )));
        }
        if sq.value == 0 || max_value.is_some_and(|max| sq.value > max) {
            return Err(ProtocolError::InvalidBoard(format!(
                "value {} at ({}, {}) is outside 1..={size}",
                sq.value, sq.x, sq.y
            )));
        }
        if !seen.insert((sq.x, sq.y)) {
            return Err(ProtocolError::InvalidBoard(format!(
                "square ({}, {}) listed twice",
                sq.x, sq.y
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Every message a peer can send or observe.
///
/// The first seven variants have a wire form. [`Message::Closed`] and
/// [`Message::Malformed`] are synthetic: the receive loop raises them
/// locally and they are never written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request to join the peer's current game.
    Join,

    /// Answer to a join request. `board` is present exactly when
    /// `accepted` is `true`.
    JoinAck {
        accepted: bool,
        board: Option<BoardSnapshot>,
    },

    /// Proposal to replace the shared puzzle.
    NewGame { board: BoardSnapshot },

    /// Answer to a new-game proposal.
    NewGameAck { accepted: bool },

    /// A value entered at column `x`, row `y`.
    Fill { x: u32, y: u32, value: u32 },

    /// Delivery confirmation for a `Fill`.
    FillAck { x: u32, y: u32, value: u32 },

    /// The peer is leaving; the connection ends after this.
    Quit,

    /// The stream ended or failed. Raised once, locally.
    Closed,

    /// A line that could not be decoded. The connection stays usable.
    Malformed { line: String, reason: String },
}

impl Message {
    /// An accepting `JoinAck` carrying the shared board.
    pub fn join_accepted(board: BoardSnapshot) -> Self {
        Self::JoinAck {
            accepted: true,
            board: Some(board),
        }
    }

    /// A declining `JoinAck`.
    pub fn join_declined() -> Self {
        Self::JoinAck {
            accepted: false,
            board: None,
        }
    }

    /// Short name of the message kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::JoinAck { .. } => "join_ack",
            Self::NewGame { .. } => "new",
            Self::NewGameAck { .. } => "new_ack",
            Self::Fill { .. } => "fill",
            Self::FillAck { .. } => "fill_ack",
            Self::Quit => "quit",
            Self::Closed => "closed",
            Self::Malformed { .. } => "malformed",
        }
    }

    /// Returns `true` for the synthetic, never-transmitted kinds.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Closed | Self::Malformed { .. })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// =========================================================================
// Tests
// =========================================================================
