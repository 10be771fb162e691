//! The network adapter: one connected stream, one writer, one receive loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use sudoku_duel_protocol::{BoardSnapshot, Message};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::framing::FrameCodec;
use crate::reader::{BoxedRead, ListenerSlot, ReceiveLoop};
use crate::writer::{BoxedWrite, OutboundWriter};
use crate::{AdapterConfig, ConnectionId, TransportError};

/// Owns both directions of a connected byte stream and speaks the line
/// protocol over it.
///
/// # Lifecycle
///
/// ```text
/// new ──→ set_listener ──→ receive_messages[_async] ──→ ... ──→ close
///                                                              (terminal)
/// ```
///
/// The adapter is created around a stream that is already connected.
/// Sending works immediately; inbound messages flow once one of the
/// receive methods is called. Exactly one receive loop may run per adapter:
/// a second call returns [`TransportError::AlreadyReceiving`].
///
/// [`close`](Self::close) is terminal. It stops the writer without
/// flushing, cancels the receive loop, and does not wait for either. The
/// registered listener sees `Message::Closed` once the receive side has
/// unwound. Call [`flush`](Self::flush) first if the last messages matter.
///
/// # Example
///
/// ```no_run
/// use sudoku_duel_transport::{NetworkAdapter, connect};
///
/// # async fn run() -> Result<(), sudoku_duel_transport::TransportError> {
/// let stream = connect("127.0.0.1:5000").await?;
/// let adapter = NetworkAdapter::new(stream)?;
/// adapter.set_listener(|msg| println!("got {msg}"));
/// adapter.receive_messages_async()?;
/// adapter.send_join();
/// # Ok(())
/// # }
/// ```
pub struct NetworkAdapter {
    conn: ConnectionId,
    writer: OutboundWriter,
    /// Taken by the first receive call.
    receiver: Mutex<Option<ReceiveLoop>>,
    listener: ListenerSlot,
    cancel: watch::Sender<bool>,
    closed: AtomicBool,
    runtime: Handle,
}

impl NetworkAdapter {
    /// Wraps a connected stream using the default [`AdapterConfig`].
    ///
    /// # Errors
    /// Returns [`TransportError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn new<S>(stream: S) -> Result<Self, TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_config(stream, AdapterConfig::default())
    }

    /// Wraps a connected stream. The config is validated first.
    pub fn with_config<S>(
        stream: S,
        config: AdapterConfig,
    ) -> Result<Self, TransportError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| TransportError::NoRuntime(e.to_string()))?;
        let config = config.validated();
        let conn = ConnectionId::next();

        let codec = || {
            let codec = FrameCodec::new(config.max_line_len);
            if config.log_frames {
                codec.with_frame_log(conn)
            } else {
                codec
            }
        };

        let (read, write) = tokio::io::split(stream);
        let frames = FramedRead::new(Box::new(read) as BoxedRead, codec());
        let sink = FramedWrite::new(Box::new(write) as BoxedWrite, codec());

        let listener = ListenerSlot::default();
        let (cancel, cancel_rx) = watch::channel(false);

        tracing::debug!(%conn, max_line_len = config.max_line_len, "adapter created");

        Ok(Self {
            conn,
            writer: OutboundWriter::new(conn, sink, runtime.clone()),
            receiver: Mutex::new(Some(ReceiveLoop {
                conn,
                frames,
                listener: listener.clone(),
                cancel: cancel_rx,
            })),
            listener,
            cancel,
            closed: AtomicBool::new(false),
            runtime,
        })
    }

    /// Identifier used in this adapter's log lines.
    pub fn id(&self) -> ConnectionId {
        self.conn
    }

    /// The outbound queue behind the `send_*` calls.
    pub fn writer(&self) -> &OutboundWriter {
        &self.writer
    }

    /// Registers the callback for inbound messages, replacing any previous
    /// one.
    ///
    /// The callback runs on the receive-loop task. Messages that arrive
    /// while no listener is registered are dropped.
    pub fn set_listener<F>(&self, listener: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        self.listener.set(Arc::new(listener));
    }

    /// Runs the receive loop on the calling task until the connection
    /// closes. The listener's last message is `Message::Closed`.
    ///
    /// # Errors
    /// [`TransportError::AlreadyReceiving`] if a receive loop was already
    /// started, [`TransportError::ConnectionClosed`] if the adapter was
    /// closed before any loop started.
    pub async fn receive_messages(&self) -> Result<(), TransportError> {
        let rx = self.take_receiver()?;
        rx.run().await;
        Ok(())
    }

    /// Spawns the receive loop onto the runtime and returns immediately.
    ///
    /// The returned handle completes after `Message::Closed` has been
    /// dispatched.
    ///
    /// # Errors
    /// Same as [`receive_messages`](Self::receive_messages).
    pub fn receive_messages_async(
        &self,
    ) -> Result<JoinHandle<()>, TransportError> {
        let rx = self.take_receiver()?;
        Ok(self.runtime.spawn(rx.run()))
    }

    fn take_receiver(&self) -> Result<ReceiveLoop, TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} was closed before receiving",
                self.conn
            )));
        }
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(TransportError::AlreadyReceiving)
    }

    /// Queues a message for sending. Never waits on the socket.
    ///
    /// Has no effect after [`close`](Self::close).
    pub fn enqueue(&self, msg: Message) {
        self.writer.enqueue(msg);
    }

    /// Sends `join:`.
    pub fn send_join(&self) {
        self.enqueue(Message::Join);
    }

    /// Sends `join_ack:`. A board is only transmitted with an acceptance;
    /// it is ignored when declining.
    pub fn send_join_ack(&self, accepted: bool, board: Option<BoardSnapshot>) {
        let msg = if accepted {
            Message::JoinAck { accepted, board }
        } else {
            Message::join_declined()
        };
        self.enqueue(msg);
    }

    /// Sends `new:` with the proposed board.
    pub fn send_new_game(&self, board: BoardSnapshot) {
        self.enqueue(Message::NewGame { board });
    }

    /// Sends `new_ack:`.
    pub fn send_new_game_ack(&self, accepted: bool) {
        self.enqueue(Message::NewGameAck { accepted });
    }

    /// Sends `fill:`.
    pub fn send_fill(&self, x: u32, y: u32, value: u32) {
        self.enqueue(Message::Fill { x, y, value });
    }

    /// Sends `fill_ack:`.
    pub fn send_fill_ack(&self, x: u32, y: u32, value: u32) {
        self.enqueue(Message::FillAck { x, y, value });
    }

    /// Sends `quit:`.
    pub fn send_quit(&self) {
        self.enqueue(Message::Quit);
    }

    /// Waits until everything queued so far has been written.
    ///
    /// # Errors
    /// [`TransportError::Shutdown`] if the adapter closed, or a write
    /// failed, first.
    pub async fn flush(&self) -> Result<(), TransportError> {
        self.writer.flush().await
    }

    /// Tears the connection down. Idempotent, never fails, never waits.
    ///
    /// The write direction is shut down first, so a peer blocked reading
    /// from us sees EOF even while it is closing too. Then the receive loop
    /// is cancelled. Queued messages that were not yet written are
    /// discarded.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(conn = %self.conn, "closing adapter");

        self.writer.stop();
        self.cancel.send_replace(true);

        // A loop that never started will not emit `Closed`.
        let unstarted = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(unstarted);
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for NetworkAdapter {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for NetworkAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkAdapter")
            .field("conn", &self.conn)
            .field("closed", &self.is_closed())
            .finish()
    }
}
