//! TCP helpers for hosting and joining a game.
//!
//! The adapter itself works over any connected stream; these are the
//! listen and dial halves a host application needs to get one.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::TransportError;

/// Listens for a joining peer.
#[derive(Debug)]
pub struct TcpPeerListener {
    listener: TcpListener,
}

impl TcpPeerListener {
    /// Binds to `addr`. Use port `0` to let the OS pick one, then read it
    /// back with [`local_addr`](Self::local_addr).
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        if let Ok(local) = listener.local_addr() {
            tracing::info!(%local, "listening for peers");
        }
        Ok(Self { listener })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.listener.local_addr().map_err(TransportError::Io)
    }

    /// Waits for the next peer to connect.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // Each frame is one small line, written and flushed on its own.
        stream.set_nodelay(true)?;
        tracing::debug!(%addr, "accepted peer");
        Ok((stream, addr))
    }
}

/// Dials a hosting peer.
pub async fn connect(addr: impl ToSocketAddrs) -> Result<TcpStream, TransportError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(TransportError::ConnectFailed)?;
    stream.set_nodelay(true)?;
    if let Ok(peer) = stream.peer_addr() {
        tracing::debug!(%peer, "connected to peer");
    }
    Ok(stream)
}
