use sudoku_duel_protocol::ProtocolError;

/// Errors that can occur in the transport layer.
///
/// None of these cross the session boundary while a connection is running:
/// the receive loop turns read failures into a `Closed` event and the
/// writer task exits quietly on write failures. They surface only from
/// setup calls (bind, connect, starting the receive loop) and from
/// [`flush`](crate::NetworkAdapter::flush).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Dialing the peer failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The receive loop was already started. Only one loop may run per
    /// adapter; an adapter closed before its loop started reports
    /// [`ConnectionClosed`](Self::ConnectionClosed) instead.
    #[error("receive loop already started for this connection")]
    AlreadyReceiving,

    /// The adapter was created outside a Tokio runtime.
    #[error("no Tokio runtime available: {0}")]
    NoRuntime(String),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading from or writing to the stream failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer was stopped before the operation completed.
    #[error("transport shut down")]
    Shutdown,
}
