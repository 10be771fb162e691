//! Transport layer for Sudoku Duel.
//!
//! Carries protocol [`Message`](sudoku_duel_protocol::Message)s over any
//! connected byte stream, one frame per line:
//!
//! - [`FrameCodec`] splits bytes into lines and lines into messages.
//! - [`OutboundWriter`] owns the write half: an unbounded FIFO drained by a
//!   single task, so callers never block on the socket.
//! - The receive loop owns the read half and hands each message to the
//!   registered [`Listener`], finishing with exactly one `Closed`.
//! - [`NetworkAdapter`] ties them together behind typed `send_*` calls and
//!   an idempotent [`close`](NetworkAdapter::close).
//!
//! The [`tcp`] helpers produce the connected stream; the adapter itself is
//! generic over `AsyncRead + AsyncWrite`, so tests can use
//! `tokio::io::duplex` instead of sockets.

mod adapter;
mod config;
mod error;
mod framing;
mod reader;
pub mod tcp;
mod writer;

pub use adapter::NetworkAdapter;
pub use config::AdapterConfig;
pub use error::TransportError;
pub use framing::FrameCodec;
pub use reader::Listener;
pub use tcp::{TcpPeerListener, connect};
pub use writer::OutboundWriter;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection, shown as `conn-N` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_next_is_increasing() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b.into_inner() > a.into_inner());
    }
}
