//! Wire protocol for Sudoku Duel.
//!
//! This crate defines the "language" two peers speak over one stream:
//!
//! - **Types** ([`Message`], [`BoardSnapshot`], [`Square`]): the values
//!   that travel on the wire, plus the two local events (`Closed`,
//!   `Malformed`) the receive side raises.
//! - **Codec** ([`encode`], [`decode`], [`try_decode`]): how a message
//!   becomes one line of text and back.
//! - **Errors** ([`ProtocolError`]): why a line could not be parsed.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (bytes and lines) and the
//! session state machine (join, new game, fill). It knows nothing about
//! sockets or tasks.
//!
//! ```text
//! Transport (lines) → Protocol (Message) → Session (negotiation, board)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode, encode, try_decode};
pub use error::ProtocolError;
pub use types::{
    BoardSnapshot, MAX_BOARD_SIZE, Message, Square, block_size, header,
};
