//! # Sudoku Duel
//!
//! Two players sharing one Sudoku grid over a plain TCP connection.
//!
//! The workspace is layered; this crate re-exports all of it:
//!
//! - [`protocol`]: messages, boards, and the `header:body` line codec
//! - [`transport`]: the network adapter (outbound queue, receive loop,
//!   close semantics) and TCP helpers
//! - [`session`]: the join / new-game / fill state machine and the board
//!   rules for local moves
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sudoku_duel::prelude::*;
//!
//! # async fn run() -> Result<(), SudokuDuelError> {
//! sudoku_duel::init_tracing();
//!
//! let host = PeerBuilder::new().host("127.0.0.1:8000").await?;
//! let (session, mut events, _addr) = host.accept().await?;
//!
//! while let Some(event) = events.recv().await {
//!     if event == SessionEvent::JoinRequested {
//!         session.accept_join(BoardSnapshot::empty(9)?)?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod logging;

pub use builder::{PeerBuilder, PeerHost, SessionEvents};
pub use error::SudokuDuelError;
pub use logging::init_tracing;

pub use sudoku_duel_protocol as protocol;
pub use sudoku_duel_session as session;
pub use sudoku_duel_transport as transport;

/// Everything a host application usually needs.
pub mod prelude {
    pub use crate::{PeerBuilder, PeerHost, SessionEvents, SudokuDuelError};
    pub use sudoku_duel_protocol::{BoardSnapshot, Message, Square};
    pub use sudoku_duel_session::{
        Board, DisconnectReason, MoveError, PeerSession, ProtocolState,
        SessionConfig, SessionError, SessionEvent,
    };
    pub use sudoku_duel_transport::{AdapterConfig, NetworkAdapter};
}
