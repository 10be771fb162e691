//! The peer session state machine.
//!
//! A [`PeerSession`] sits on top of one [`NetworkAdapter`] and turns raw
//! messages into the join / new-game / fill negotiation:
//!
//! ```text
//!   host application
//!     │  join(), fill(), accept_join(), ...      ▲ SessionEvent (mpsc)
//!     ▼                                          │
//!   PeerSession ── state + board behind a Mutex ─┤
//!     │  send_*                                  │ listener
//!     ▼                                          │
//!   NetworkAdapter ── writer task      receive loop task
//! ```
//!
//! Two paths mutate the shared board: local calls on the caller's task and
//! remote messages on the receive-loop task. Both go through the same
//! mutex, and every event is emitted while that mutex is held, so the event
//! stream always matches the order of state changes.
//!
//! Local moves are checked against the board rules before anything is
//! sent. Remote moves are applied as-is and acknowledged: the protocol has
//! no way to reject a peer's move, so both sides trust each other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use sudoku_duel_protocol::{BoardSnapshot, Message};
use sudoku_duel_transport::{ConnectionId, NetworkAdapter};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    Board, DisconnectReason, ProtocolState, SessionConfig, SessionError,
    SessionEvent,
};

/// One side of a two-player shared puzzle.
///
/// Cheap to clone; clones share the same connection and board.
///
/// # Example
///
/// ```no_run
/// use sudoku_duel_session::{PeerSession, SessionConfig, SessionEvent};
///
/// # async fn run(stream: tokio::net::TcpStream) -> Result<(), sudoku_duel_session::SessionError> {
/// let (session, mut events) = PeerSession::new(stream, SessionConfig::default())?;
/// session.start()?;
/// session.join()?;
///
/// while let Some(event) = events.recv().await {
///     match event {
///         SessionEvent::JoinAccepted { board } => {
///             println!("playing on a {}x{} board", board.size(), board.size());
///         }
///         SessionEvent::Disconnected { .. } => break,
///         _ => {}
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PeerSession {
    shared: Arc<Shared>,
}

struct Shared {
    adapter: NetworkAdapter,
    inner: Mutex<Inner>,
    events: mpsc::UnboundedSender<SessionEvent>,
    config: SessionConfig,
}

#[derive(Debug)]
struct Inner {
    state: ProtocolState,
    board: Option<Board>,
    /// A peer asked to join and the host has not answered yet.
    join_pending: bool,
    /// Board we proposed; adopted if the peer accepts.
    proposed: Option<BoardSnapshot>,
    /// Board the peer proposed; adopted if we accept.
    offered: Option<BoardSnapshot>,
}

impl PeerSession {
    /// Wraps a connected stream. Inbound messages are not processed until
    /// [`start`](Self::start) or [`run`](Self::run) is called; sending
    /// works right away.
    ///
    /// Returns the session and the receiving end of its event channel.
    ///
    /// # Errors
    /// Fails outside a Tokio runtime.
    pub fn new<S>(
        stream: S,
        config: SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), SessionError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let config = config.validated();
        let adapter = NetworkAdapter::with_config(stream, config.adapter.clone())?;
        let (events, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            adapter,
            inner: Mutex::new(Inner {
                state: ProtocolState::Idle,
                board: None,
                join_pending: false,
                proposed: None,
                offered: None,
            }),
            events,
            config,
        });

        // The adapter owns the listener, so the listener must not own the
        // adapter back.
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        shared.adapter.set_listener(move |msg| {
            if let Some(shared) = weak.upgrade() {
                shared.on_message(msg);
            }
        });

        Ok((Self { shared }, events_rx))
    }

    /// Processes inbound messages on a background task.
    ///
    /// # Errors
    /// Fails if the session was already started or closed.
    pub fn start(&self) -> Result<JoinHandle<()>, SessionError> {
        Ok(self.shared.adapter.receive_messages_async()?)
    }

    /// Processes inbound messages on the calling task until the connection
    /// closes.
    pub async fn run(&self) -> Result<(), SessionError> {
        self.shared.adapter.receive_messages().await?;
        Ok(())
    }

    /// Identifier of the underlying connection, as it appears in logs.
    pub fn id(&self) -> ConnectionId {
        self.shared.adapter.id()
    }

    /// Current protocol state.
    pub fn state(&self) -> ProtocolState {
        self.shared.lock().state
    }

    /// The shared board, once one is in play.
    pub fn board(&self) -> Option<Board> {
        self.shared.lock().board.clone()
    }

    /// Asks the peer to join its game. `Idle` → `JoinRequested`.
    pub fn join(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        inner.expect_state(ProtocolState::Idle, "join")?;
        self.shared.adapter.send_join();
        inner.state = ProtocolState::JoinRequested;
        info!(conn = %self.id(), "join requested");
        Ok(())
    }

    /// Accepts a pending join and shares `board`. `Idle` → `Joined`.
    pub fn accept_join(&self, board: BoardSnapshot) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        inner.expect_state(ProtocolState::Idle, "accept a join")?;
        if !inner.join_pending {
            return Err(SessionError::NothingPending("join"));
        }
        let grid = Board::from_snapshot(&board)?;

        self.shared.adapter.send_join_ack(true, Some(board));
        inner.join_pending = false;
        inner.board = Some(grid);
        inner.state = ProtocolState::Joined;
        info!(conn = %self.id(), "join accepted");
        Ok(())
    }

    /// Declines a pending join.
    ///
    /// With [`SessionConfig::close_after_join_decline`] set (the default)
    /// the answer is flushed and the session closes. Otherwise it stays
    /// `Idle` and can accept a later join.
    pub async fn decline_join(&self) -> Result<(), SessionError> {
        let close = {
            let mut inner = self.shared.lock();
            inner.expect_state(ProtocolState::Idle, "decline a join")?;
            if !inner.join_pending {
                return Err(SessionError::NothingPending("join"));
            }
            self.shared.adapter.send_join_ack(false, None);
            inner.join_pending = false;
            info!(conn = %self.id(), "join declined");

            let close = self.shared.config.close_after_join_decline;
            if close {
                self.shared.disconnect(&mut inner, DisconnectReason::LocalClose);
            }
            close
        };

        if close {
            self.shared.flush_and_close().await;
        }
        Ok(())
    }

    /// Fills a square after checking the board rules, then tells the peer.
    ///
    /// Only allowed while `Joined`. A rejected move sends nothing.
    pub fn fill(&self, x: u32, y: u32, value: u32) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        let board = inner.playing_board("fill a square")?;
        board.fill(x, y, value)?;
        self.shared.adapter.send_fill(x, y, value);
        debug!(conn = %self.id(), x, y, value, "local fill");
        Ok(())
    }

    /// Empties a square we or the peer filled, and tells the peer with a
    /// zero-valued fill. Clues cannot be cleared.
    pub fn clear(&self, x: u32, y: u32) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        let board = inner.playing_board("clear a square")?;
        board.clear(x, y)?;
        self.shared.adapter.send_fill(x, y, 0);
        debug!(conn = %self.id(), x, y, "local clear");
        Ok(())
    }

    /// Proposes a new shared board. `Joined` → `NewGameRequested`.
    ///
    /// The current board stays in play until the peer accepts.
    pub fn request_new_game(&self, board: BoardSnapshot) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        inner.expect_state(ProtocolState::Joined, "request a new game")?;
        Board::from_snapshot(&board)?;

        self.shared.adapter.send_new_game(board.clone());
        inner.proposed = Some(board);
        inner.state = ProtocolState::NewGameRequested;
        info!(conn = %self.id(), "new game requested");
        Ok(())
    }

    /// Accepts the peer's pending proposal and switches to its board.
    pub fn accept_new_game(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        inner.expect_state(ProtocolState::Joined, "accept a new game")?;
        let offered = inner
            .offered
            .take()
            .ok_or(SessionError::NothingPending("new game"))?;
        let grid = match Board::from_snapshot(&offered) {
            Ok(grid) => grid,
            Err(e) => {
                inner.offered = Some(offered);
                return Err(e.into());
            }
        };

        self.shared.adapter.send_new_game_ack(true);
        inner.board = Some(grid);
        info!(conn = %self.id(), "new game accepted");
        Ok(())
    }

    /// Declines the peer's pending proposal; the current board stays.
    pub fn decline_new_game(&self) -> Result<(), SessionError> {
        let mut inner = self.shared.lock();
        inner.expect_state(ProtocolState::Joined, "decline a new game")?;
        inner
            .offered
            .take()
            .ok_or(SessionError::NothingPending("new game"))?;

        self.shared.adapter.send_new_game_ack(false);
        info!(conn = %self.id(), "new game declined");
        Ok(())
    }

    /// Leaves the game: sends `quit:`, waits for it to be written, then
    /// closes the connection. Calling it on a closed session does nothing.
    pub async fn quit(&self) -> Result<(), SessionError> {
        {
            let mut inner = self.shared.lock();
            if inner.state == ProtocolState::Closed {
                return Ok(());
            }
            self.shared.adapter.send_quit();
            self.shared.disconnect(&mut inner, DisconnectReason::LocalClose);
            info!(conn = %self.id(), "quit");
        }
        self.shared.flush_and_close().await;
        Ok(())
    }

    /// Closes the connection at once, discarding anything not yet sent.
    pub fn close(&self) {
        {
            let mut inner = self.shared.lock();
            self.shared.disconnect(&mut inner, DisconnectReason::LocalClose);
        }
        self.shared.adapter.close();
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("conn", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    fn expect_state(
        &self,
        expected: ProtocolState,
        op: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    fn playing_board(&mut self, op: &'static str) -> Result<&mut Board, SessionError> {
        self.expect_state(ProtocolState::Joined, op)?;
        let state = self.state;
        self.board
            .as_mut()
            .ok_or(SessionError::InvalidState { op, state })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // The host may have dropped its receiver; the session still runs.
        let _ = self.events.send(event);
    }

    /// Moves to `Closed` and emits `Disconnected`, once.
    fn disconnect(&self, inner: &mut Inner, reason: DisconnectReason) {
        if inner.state == ProtocolState::Closed {
            return;
        }
        inner.state = ProtocolState::Closed;
        inner.join_pending = false;
        inner.proposed = None;
        inner.offered = None;
        info!(conn = %self.adapter.id(), ?reason, "session closed");
        self.emit(SessionEvent::Disconnected { reason });
    }

    async fn flush_and_close(&self) {
        if let Err(e) = self.adapter.flush().await {
            debug!(conn = %self.adapter.id(), error = %e, "flush before close failed");
        }
        self.adapter.close();
    }

    /// Handles one inbound message. Runs on the receive-loop task.
    fn on_message(&self, msg: Message) {
        let conn = self.adapter.id();
        let mut inner = self.lock();
        let state = inner.state;

        if state == ProtocolState::Closed {
            debug!(%conn, kind = msg.kind(), "session closed, message ignored");
            return;
        }

        match msg {
            Message::Join if state == ProtocolState::Idle && !inner.join_pending => {
                inner.join_pending = true;
                info!(%conn, "peer asked to join");
                self.emit(SessionEvent::JoinRequested);
            }

            Message::JoinAck {
                accepted: true,
                board: Some(board),
            } if state == ProtocolState::JoinRequested => {
                match Board::from_snapshot(&board) {
                    Ok(grid) => {
                        inner.board = Some(grid);
                        inner.state = ProtocolState::Joined;
                        info!(%conn, size = board.size(), "joined");
                        self.emit(SessionEvent::JoinAccepted { board });
                    }
                    Err(e) => warn!(%conn, error = %e, "unusable board in join_ack"),
                }
            }

            Message::JoinAck { accepted: false, .. }
                if state == ProtocolState::JoinRequested =>
            {
                info!(%conn, "join declined by peer");
                self.emit(SessionEvent::JoinDeclined);
                self.disconnect(&mut inner, DisconnectReason::LocalClose);
                self.adapter.close();
            }

            Message::NewGame { board } if state == ProtocolState::Joined => {
                info!(%conn, size = board.size(), "peer proposed a new game");
                inner.offered = Some(board.clone());
                self.emit(SessionEvent::NewGameRequested { board });
            }

            Message::NewGame { .. } if state == ProtocolState::NewGameRequested => {
                // Both sides proposed at once. Declining theirs means each
                // side gets a decline and returns to `Joined`.
                info!(%conn, "crossing new game proposals, declining the peer's");
                self.adapter.send_new_game_ack(false);
            }

            Message::NewGameAck { accepted } if state == ProtocolState::NewGameRequested => {
                inner.state = ProtocolState::Joined;
                let proposed = inner.proposed.take();
                match proposed.map(|b| Board::from_snapshot(&b).map(|grid| (b, grid))) {
                    Some(Ok((board, grid))) if accepted => {
                        inner.board = Some(grid);
                        info!(%conn, "new game accepted by peer");
                        self.emit(SessionEvent::NewGameAccepted { board });
                    }
                    _ => {
                        info!(%conn, accepted, "new game not adopted");
                        self.emit(SessionEvent::NewGameDeclined);
                    }
                }
            }

            // The current board stays in play while our proposal is pending,
            // so a fill the peer sent before seeing it still applies.
            Message::Fill { x, y, value } if state.is_playing() => {
                let applied = inner
                    .board
                    .as_mut()
                    .is_some_and(|board| board.apply_remote(x, y, value));
                if applied {
                    self.adapter.send_fill_ack(x, y, value);
                    debug!(%conn, x, y, value, "remote fill");
                    self.emit(SessionEvent::RemoteFill { x, y, value });
                } else {
                    warn!(%conn, x, y, value, "remote fill outside the board, ignored");
                    self.emit(SessionEvent::FillIgnored { x, y, value });
                }
            }

            Message::Fill { x, y, value } => {
                warn!(%conn, x, y, value, %state, "remote fill with no board in play, ignored");
                self.emit(SessionEvent::FillIgnored { x, y, value });
            }

            Message::FillAck { x, y, value } => {
                self.emit(SessionEvent::FillAcknowledged { x, y, value });
            }

            Message::Malformed { line, reason } => {
                self.emit(SessionEvent::ProtocolWarning { line, reason });
            }

            Message::Quit => {
                self.disconnect(&mut inner, DisconnectReason::PeerQuit);
                self.adapter.close();
            }

            Message::Closed => {
                self.disconnect(&mut inner, DisconnectReason::ConnectionLost);
                self.adapter.close();
            }

            other => {
                debug!(%conn, kind = other.kind(), %state, "unexpected message ignored");
            }
        }
    }
}
