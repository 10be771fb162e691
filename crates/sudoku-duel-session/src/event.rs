//! Events a session surfaces to its host application.

use sudoku_duel_protocol::BoardSnapshot;

/// Something the host application should react to.
///
/// Events are delivered on the session's event channel in the order the
/// session observed them. Decision events (`JoinRequested`,
/// `NewGameRequested`) wait for the host to call the matching
/// `accept_*`/`decline_*` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A peer asked to join. Answer with
    /// [`accept_join`](crate::PeerSession::accept_join) or
    /// [`decline_join`](crate::PeerSession::decline_join).
    JoinRequested,

    /// Our join was accepted; `board` is now the shared board.
    JoinAccepted { board: BoardSnapshot },

    /// Our join was declined. A `Disconnected` event follows.
    JoinDeclined,

    /// The peer proposed a new shared board. Answer with
    /// [`accept_new_game`](crate::PeerSession::accept_new_game) or
    /// [`decline_new_game`](crate::PeerSession::decline_new_game).
    NewGameRequested { board: BoardSnapshot },

    /// Our proposal was accepted; `board` is now the shared board.
    NewGameAccepted { board: BoardSnapshot },

    /// Our proposal was declined; the previous board stays in play.
    NewGameDeclined,

    /// The peer filled (or, with `value == 0`, cleared) a square. It has
    /// already been applied and acknowledged.
    RemoteFill { x: u32, y: u32, value: u32 },

    /// The peer sent a fill we could not apply: no board was in play, or
    /// the square lies outside it. Nothing was acknowledged.
    FillIgnored { x: u32, y: u32, value: u32 },

    /// The peer confirmed one of our fills arrived.
    FillAcknowledged { x: u32, y: u32, value: u32 },

    /// The peer sent a line we could not parse. The connection stays open.
    ProtocolWarning { line: String, reason: String },

    /// The session ended. Always the last event.
    Disconnected { reason: DisconnectReason },
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer sent `quit:`.
    PeerQuit,
    /// The stream ended or failed.
    ConnectionLost,
    /// We quit, declined, were declined, or closed the session ourselves.
    LocalClose,
}
