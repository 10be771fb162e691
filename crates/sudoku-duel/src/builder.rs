//! `PeerBuilder`: the quickest way to host or join a game over TCP.
//!
//! The session layer only needs a connected stream. This module adds the
//! listen/dial step and starts the receive loop, so a host application
//! goes straight from an address to a running [`PeerSession`].

use std::net::SocketAddr;
use std::path::Path;

use sudoku_duel_session::{PeerSession, SessionConfig, SessionEvent};
use sudoku_duel_transport::{TcpPeerListener, connect};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::SudokuDuelError;

/// Receiving end of a session's event channel.
pub type SessionEvents = UnboundedReceiver<SessionEvent>;

/// Builder for hosting or joining a game.
///
/// # Example
///
/// ```rust,no_run
/// use sudoku_duel::prelude::*;
///
/// # async fn run() -> Result<(), SudokuDuelError> {
/// let (session, mut events) = PeerBuilder::new()
///     .log_frames(true)
///     .connect("127.0.0.1:8000")
///     .await?;
/// session.join()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct PeerBuilder {
    config: SessionConfig,
}

impl PeerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Reads the session configuration from a JSON file. Missing fields
    /// keep their defaults.
    pub fn config_file(
        mut self,
        path: impl AsRef<Path>,
    ) -> Result<Self, SudokuDuelError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.config = serde_json::from_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded session config");
        Ok(self)
    }

    /// Logs every line sent and received at `debug` level.
    pub fn log_frames(mut self, enabled: bool) -> Self {
        self.config.adapter.log_frames = enabled;
        self
    }

    /// Sets the longest inbound line accepted.
    pub fn max_line_len(mut self, bytes: usize) -> Self {
        self.config.adapter.max_line_len = bytes;
        self
    }

    /// Whether declining a join also closes the connection.
    pub fn close_after_join_decline(mut self, enabled: bool) -> Self {
        self.config.close_after_join_decline = enabled;
        self
    }

    /// The configuration sessions will be created with.
    pub fn session_config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a session on an already-connected stream.
    pub fn attach<S>(
        &self,
        stream: S,
    ) -> Result<(PeerSession, SessionEvents), SudokuDuelError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (session, events) = PeerSession::new(stream, self.config.clone())?;
        session.start()?;
        Ok((session, events))
    }

    /// Dials a hosting peer and starts a session.
    pub async fn connect(
        self,
        addr: impl ToSocketAddrs,
    ) -> Result<(PeerSession, SessionEvents), SudokuDuelError> {
        let stream = connect(addr).await?;
        self.attach(stream)
    }

    /// Listens for joining peers.
    pub async fn host(
        self,
        addr: impl ToSocketAddrs,
    ) -> Result<PeerHost, SudokuDuelError> {
        let listener = TcpPeerListener::bind(addr).await?;
        Ok(PeerHost {
            listener,
            builder: self,
        })
    }
}

/// A bound listener that turns each incoming connection into a session.
#[derive(Debug)]
pub struct PeerHost {
    listener: TcpPeerListener,
    builder: PeerBuilder,
}

impl PeerHost {
    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, SudokuDuelError> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for the next peer and starts a session with it.
    pub async fn accept(
        &self,
    ) -> Result<(PeerSession, SessionEvents, SocketAddr), SudokuDuelError> {
        let (stream, addr) = self.listener.accept().await?;
        let (session, events) = self.builder.attach(stream)?;
        tracing::info!(conn = %session.id(), %addr, "peer connected");
        Ok((session, events, addr))
    }
}
