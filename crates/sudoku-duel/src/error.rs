//! Unified error type for Sudoku Duel.

use sudoku_duel_protocol::ProtocolError;
use sudoku_duel_session::SessionError;
use sudoku_duel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attributes let `?` convert errors from any layer.
#[derive(Debug, thiserror::Error)]
pub enum SudokuDuelError {
    /// A connection could not be opened, accepted, or used.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A board or message was invalid.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session operation was refused.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A config file could not be read.
    #[error("cannot read config: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A config file was not valid JSON for a `SessionConfig`.
    #[error("invalid config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}
