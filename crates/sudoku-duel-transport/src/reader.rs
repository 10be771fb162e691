//! Receive loop and the listener slot it dispatches into.
//!
//! The loop reads one frame at a time and hands each decoded [`Message`]
//! to whatever listener is registered at that moment. It ends on EOF, on a
//! read error, or when the adapter cancels it, and in every case it
//! delivers exactly one `Message::Closed` as its last dispatch.

use std::sync::{Arc, PoisonError, RwLock};

use futures_util::StreamExt;
use sudoku_duel_protocol::Message;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::codec::FramedRead;

use crate::ConnectionId;
use crate::framing::FrameCodec;

pub(crate) type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type FrameStream = FramedRead<BoxedRead, FrameCodec>;

/// Callback invoked for every inbound message.
///
/// Runs on the receive-loop task, so it must not block. Hand work off to a
/// channel instead.
pub type Listener = Arc<dyn Fn(Message) + Send + Sync>;

/// Holds the current listener. Replacing it takes effect from the next
/// dispatched message on.
#[derive(Clone, Default)]
pub(crate) struct ListenerSlot(Arc<RwLock<Option<Listener>>>);

impl ListenerSlot {
    pub(crate) fn set(&self, listener: Listener) {
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(listener);
    }

    pub(crate) fn notify(&self, conn: ConnectionId, msg: Message) {
        // Clone out of the lock so a listener may call `set_listener`.
        let listener = self
            .0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => listener(msg),
            None => {
                tracing::debug!(%conn, kind = msg.kind(), "no listener, message dropped");
            }
        }
    }
}

/// A receive loop that has been set up but not started.
pub(crate) struct ReceiveLoop {
    pub(crate) conn: ConnectionId,
    pub(crate) frames: FrameStream,
    pub(crate) listener: ListenerSlot,
    pub(crate) cancel: watch::Receiver<bool>,
}

impl ReceiveLoop {
    /// Runs until the stream ends or the loop is cancelled.
    pub(crate) async fn run(mut self) {
        tracing::debug!(conn = %self.conn, "receive loop started");

        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.wait_for(|cancelled| *cancelled) => break "closed locally",
                next = self.frames.next() => next,
            };

            match next {
                Some(Ok(msg)) => {
                    if let Message::Malformed { line, reason } = &msg {
                        tracing::warn!(conn = %self.conn, %line, %reason, "malformed frame");
                    }
                    self.listener.notify(self.conn, msg);
                }
                Some(Err(e)) => {
                    tracing::debug!(conn = %self.conn, error = %e, "read failed");
                    break "read error";
                }
                None => break "end of stream",
            }
        };

        tracing::info!(conn = %self.conn, reason, "connection closed");
        self.listener.notify(self.conn, Message::Closed);
    }
}
