//! Error types for the session layer.

use sudoku_duel_transport::TransportError;

use crate::ProtocolState;

/// Why a local move was rejected before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The square lies outside the board.
    #[error("square ({x}, {y}) is outside a {size}x{size} board")]
    OutOfBounds { x: u32, y: u32, size: u32 },

    /// The value is not in `1..=size`.
    #[error("value {value} is not in 1..={size}")]
    ValueOutOfRange { value: u32, size: u32 },

    /// The square holds a given clue and cannot change.
    #[error("square ({x}, {y}) is fixed")]
    FixedSquare { x: u32, y: u32 },

    /// The value already appears in the same row.
    #[error("{value} already appears in row {y}")]
    RowConflict { y: u32, value: u32 },

    /// The value already appears in the same column.
    #[error("{value} already appears in column {x}")]
    ColumnConflict { x: u32, value: u32 },

    /// The value already appears in the same sub-block.
    #[error("{value} already appears in the block containing ({x}, {y})")]
    BlockConflict { x: u32, y: u32, value: u32 },
}

/// Errors returned by [`PeerSession`](crate::PeerSession) operations.
///
/// Only local calls fail. Problems on the wire arrive as
/// [`SessionEvent`](crate::SessionEvent)s instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is not allowed in the current protocol state.
    #[error("cannot {op} while {state}")]
    InvalidState {
        op: &'static str,
        state: ProtocolState,
    },

    /// There is no peer request of this kind waiting for an answer.
    #[error("no {0} request is pending")]
    NothingPending(&'static str),

    /// A local move broke a board rule.
    #[error("move rejected: {0}")]
    Move(#[from] MoveError),

    /// A board could not be built.
    #[error("invalid board: {0}")]
    Board(#[from] sudoku_duel_protocol::ProtocolError),

    /// The connection failed to start or to flush.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
