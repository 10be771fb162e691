//! Peer session layer for Sudoku Duel.
//!
//! This crate turns a connection into a game between two peers:
//!
//! 1. **Negotiation**: joining a host's game and agreeing on new boards
//!    ([`PeerSession`], [`ProtocolState`])
//! 2. **Moves**: checking local fills against the rules and applying the
//!    peer's fills ([`Board`], [`MoveError`])
//! 3. **Events**: telling the host application what happened
//!    ([`SessionEvent`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Host application (above)  ← reacts to SessionEvents, calls fill() etc.
//!     ↕
//! Session Layer (this crate)  ← protocol state + shared board
//!     ↕
//! Transport Layer (below)  ← NetworkAdapter: queue, receive loop, close
//! ```

mod board;
mod config;
mod error;
mod event;
mod machine;
mod state;

pub use board::{Board, Entry};
pub use config::SessionConfig;
pub use error::{MoveError, SessionError};
pub use event::{DisconnectReason, SessionEvent};
pub use machine::PeerSession;
pub use state::ProtocolState;
