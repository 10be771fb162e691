//! Outbound queue writer: an unbounded FIFO drained by one sender task.
//!
//! Callers never touch the socket. [`OutboundWriter::enqueue`] pushes onto
//! an `mpsc` channel and returns immediately; a single Tokio task pops
//! messages in order and writes each one as a complete line, flushing after
//! every line. Because only that task writes, two callers can never
//! interleave partial lines.
//!
//! ```text
//! enqueue ─┐
//! enqueue ─┼─→ [ unbounded mpsc ] ─→ sender task ─→ FramedWrite ─→ socket
//! enqueue ─┘
//! ```
//!
//! The task is spawned lazily on the first enqueue and ends on
//! [`OutboundWriter::stop`], on a write failure, or when the writer is
//! dropped.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::SinkExt;
use sudoku_duel_protocol::Message;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::FramedWrite;

use crate::framing::FrameCodec;
use crate::{ConnectionId, TransportError};

pub(crate) type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;
pub(crate) type FrameSink = FramedWrite<BoxedWrite, FrameCodec>;

/// An item on the outbound queue.
enum Outbound {
    /// A message to write.
    Frame(Message),
    /// Resolved once every item queued before it has been written.
    Barrier(oneshot::Sender<()>),
}

/// Lifecycle of the sender task.
///
/// ```text
///   Idle ──(first enqueue)──→ Running ──(stop / write error)──→ Stopped
///    │                                                            ↑
///    └───────────────────────────(stop)───────────────────────────┘
/// ```
enum WriterState {
    /// No task yet; the sink waits here until the first message.
    Idle(FrameSink),
    Running {
        queue: mpsc::UnboundedSender<Outbound>,
        stop: oneshot::Sender<()>,
    },
    Stopped,
}

/// Serializes writes onto one stream from any number of callers.
pub struct OutboundWriter {
    conn: ConnectionId,
    state: Mutex<WriterState>,
    runtime: Handle,
}

impl OutboundWriter {
    pub(crate) fn new(
        conn: ConnectionId,
        sink: FrameSink,
        runtime: Handle,
    ) -> Self {
        Self {
            conn,
            state: Mutex::new(WriterState::Idle(sink)),
            runtime,
        }
    }

    /// Appends a message to the queue without waiting for the socket.
    ///
    /// Messages from one caller are written in the order they were
    /// enqueued. After [`stop`](Self::stop), or once a write has failed,
    /// messages are dropped silently.
    pub fn enqueue(&self, msg: Message) {
        if msg.is_local() {
            tracing::warn!(
                conn = %self.conn,
                kind = msg.kind(),
                "refusing to send a local-only message"
            );
            return;
        }
        if !self.push(Outbound::Frame(msg)) {
            tracing::trace!(conn = %self.conn, "writer stopped, message dropped");
        }
    }

    /// Waits until every message enqueued before this call has been
    /// written and flushed.
    ///
    /// # Errors
    /// Returns [`TransportError::Shutdown`] if the writer was stopped or a
    /// write failed before the queue drained that far.
    pub async fn flush(&self) -> Result<(), TransportError> {
        let (done_tx, done_rx) = oneshot::channel();
        if !self.push(Outbound::Barrier(done_tx)) {
            return Err(TransportError::Shutdown);
        }
        done_rx.await.map_err(|_| TransportError::Shutdown)
    }

    /// Stops the sender task and shuts down the write direction of the
    /// stream. Does not wait: queued messages that have not been written
    /// yet are discarded. Calling it again has no effect.
    pub fn stop(&self) {
        let previous =
            std::mem::replace(&mut *self.lock(), WriterState::Stopped);
        match previous {
            WriterState::Running { stop, .. } => {
                // The task may already be gone after a write failure.
                let _ = stop.send(());
            }
            WriterState::Idle(sink) => {
                // Nothing was ever sent, but the peer still has to see the
                // write side close.
                let mut io = sink.into_inner();
                self.runtime.spawn(async move {
                    let _ = io.shutdown().await;
                });
            }
            WriterState::Stopped => {}
        }
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        matches!(*self.lock(), WriterState::Stopped)
    }

    /// Queues an item, starting the sender task if needed. Returns `false`
    /// if the item could not be queued.
    fn push(&self, item: Outbound) -> bool {
        let mut state = self.lock();

        if matches!(*state, WriterState::Idle(_)) {
            let WriterState::Idle(sink) =
                std::mem::replace(&mut *state, WriterState::Stopped)
            else {
                return false;
            };
            let (queue, queue_rx) = mpsc::unbounded_channel();
            let (stop, stop_rx) = oneshot::channel();
            self.runtime
                .spawn(run_writer(self.conn, sink, queue_rx, stop_rx));
            tracing::debug!(conn = %self.conn, "writer task started");
            *state = WriterState::Running { queue, stop };
        }

        match &*state {
            // Fails only if the task has exited after a write error.
            WriterState::Running { queue, .. } => queue.send(item).is_ok(),
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OutboundWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundWriter")
            .field("conn", &self.conn)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The sender task: drains the queue one line at a time until stopped.
///
/// Both the wait for the next item and the write itself race against the
/// stop signal, so a peer that stops reading cannot make `stop` hang.
async fn run_writer(
    conn: ConnectionId,
    mut sink: FrameSink,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = &mut stop => break,
            item = queue.recv() => item,
        };

        match item {
            Some(Outbound::Frame(msg)) => {
                let kind = msg.kind();
                let result = tokio::select! {
                    biased;
                    _ = &mut stop => break,
                    // `send` flushes after the line.
                    result = sink.send(msg) => result,
                };
                match result {
                    Ok(()) => {}
                    Err(TransportError::Protocol(e)) => {
                        tracing::warn!(%conn, kind, error = %e, "message not encodable, skipped");
                    }
                    Err(e) => {
                        // No retry: the reader side reports `Closed`.
                        tracing::debug!(%conn, error = %e, "write failed, writer exiting");
                        return;
                    }
                }
            }
            Some(Outbound::Barrier(done)) => {
                let _ = done.send(());
            }
            // Every sender is gone: the writer itself was dropped.
            None => break,
        }
    }

    let pending = queue.len();
    if pending > 0 {
        tracing::debug!(%conn, pending, "discarding unsent messages");
    }
    let mut io = sink.into_inner();
    let _ = io.shutdown().await;
    tracing::debug!(%conn, "writer task stopped");
}
