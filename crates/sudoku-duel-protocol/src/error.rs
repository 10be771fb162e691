//! Error types for the protocol layer.
//!
//! Each crate in Sudoku Duel defines its own error enum. A `ProtocolError`
//! always means a line of text (or a board) did not fit the wire format; it
//! never means a socket failed.

/// Errors that can occur while encoding or decoding a frame.
///
/// Decoding failures are not fatal to a connection: the receive loop turns
/// every `ProtocolError` into a [`Message::Malformed`](crate::Message) event
/// and keeps reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The line does not start with any known header.
    #[error("unknown header in {0:?}")]
    UnknownHeader(String),

    /// The body has the wrong number of fields for its header.
    #[error("{header} expects {expected} field(s), got {actual}")]
    Arity {
        header: &'static str,
        expected: &'static str,
        actual: usize,
    },

    /// A body field is not an unsigned integer.
    #[error("field {index} is not an unsigned integer: {token:?}")]
    InvalidField { index: usize, token: String },

    /// A flag field (accept or fixed) is neither `0` nor `1`.
    #[error("field {index} must be 0 or 1, got {value}")]
    InvalidFlag { index: usize, value: u32 },

    /// The board violates a snapshot invariant (size, range, duplicates).
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// Synthetic messages (`Closed`, `Malformed`) exist only locally and
    /// have no wire representation.
    #[error("{0} is a local event and cannot be sent")]
    NotTransmittable(&'static str),
}
