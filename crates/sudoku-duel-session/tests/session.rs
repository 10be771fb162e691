//! Integration tests for `PeerSession`.
//!
//! Two sessions are wired back to back through `tokio::io::duplex`, or one
//! session faces a raw pipe end so a test can write exact protocol lines
//! and read what the session sends back.

use std::time::Duration;

use sudoku_duel_protocol::{BoardSnapshot, Square};
use sudoku_duel_session::{
    DisconnectReason, MoveError, PeerSession, ProtocolState, SessionConfig,
    SessionError, SessionEvent,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

struct Peer {
    session: PeerSession,
    events: UnboundedReceiver<SessionEvent>,
}

impl Peer {
    fn new(stream: DuplexStream, config: SessionConfig) -> Self {
        let (session, events) = PeerSession::new(stream, config).unwrap();
        session.start().unwrap();
        Self { session, events }
    }

    async fn next(&mut self) -> SessionEvent {
        timeout(WAIT, self.events.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed")
    }

    /// Asserts nothing else arrives for a short while.
    async fn assert_quiet(&mut self) {
        let extra = timeout(Duration::from_millis(100), self.events.recv()).await;
        assert!(extra.is_err(), "unexpected event: {extra:?}");
    }
}

fn pair_with(config: SessionConfig) -> (Peer, Peer) {
    let (a, b) = tokio::io::duplex(4096);
    (Peer::new(a, config.clone()), Peer::new(b, config))
}

fn pair() -> (Peer, Peer) {
    pair_with(SessionConfig::default())
}

/// ```text
/// 1 . | . .
/// . . | . 3
/// ----+----
/// . . | . .
/// . . | . .
/// ```
fn puzzle() -> BoardSnapshot {
    BoardSnapshot::new(4, vec![Square::clue(0, 0, 1), Square::clue(3, 1, 3)])
        .unwrap()
}

fn other_puzzle() -> BoardSnapshot {
    BoardSnapshot::new(4, vec![Square::clue(1, 1, 2)]).unwrap()
}

/// `guest` joins `host`'s game on `puzzle()`.
async fn joined() -> (Peer, Peer) {
    let (mut guest, mut host) = pair();
    guest.session.join().unwrap();
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.accept_join(puzzle()).unwrap();
    assert_eq!(
        guest.next().await,
        SessionEvent::JoinAccepted { board: puzzle() }
    );
    (guest, host)
}

/// A session facing a raw pipe end.
struct Raw {
    lines: tokio::io::Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
    write: tokio::io::WriteHalf<DuplexStream>,
}

impl Raw {
    async fn send(&mut self, line: &str) {
        self.write.write_all(line.as_bytes()).await.unwrap();
        self.write.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("stream ended")
    }
}

fn raw_pair(config: SessionConfig) -> (Raw, Peer) {
    let (raw, stream) = tokio::io::duplex(4096);
    let (read, write) = tokio::io::split(raw);
    let raw = Raw {
        lines: BufReader::new(read).lines(),
        write,
    };
    (raw, Peer::new(stream, config))
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_then_quit_is_seen_as_request_then_single_disconnect() {
    let (mut a, mut b) = pair();

    a.session.join().unwrap();
    a.session.quit().await.unwrap();

    assert_eq!(b.next().await, SessionEvent::JoinRequested);
    assert_eq!(
        b.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::PeerQuit
        }
    );
    b.assert_quiet().await;
    assert_eq!(b.session.state(), ProtocolState::Closed);

    assert_eq!(
        a.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::LocalClose
        }
    );
    a.assert_quiet().await;
}

#[tokio::test]
async fn test_accepted_join_shares_the_board() {
    let (guest, host) = joined().await;

    assert_eq!(guest.session.state(), ProtocolState::Joined);
    assert_eq!(host.session.state(), ProtocolState::Joined);
    assert_eq!(guest.session.board(), host.session.board());
    assert_eq!(guest.session.board().unwrap().snapshot().unwrap(), puzzle());
}

#[tokio::test]
async fn test_declined_join_closes_both_sides() {
    let (mut guest, mut host) = pair();

    guest.session.join().unwrap();
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.decline_join().await.unwrap();

    assert_eq!(guest.next().await, SessionEvent::JoinDeclined);
    assert_eq!(
        guest.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::LocalClose
        }
    );
    assert_eq!(guest.session.state(), ProtocolState::Closed);

    assert_eq!(
        host.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::LocalClose
        }
    );
    assert_eq!(host.session.state(), ProtocolState::Closed);
}

#[tokio::test]
async fn test_decline_without_close_stays_idle_for_the_next_join() {
    let config = SessionConfig {
        close_after_join_decline: false,
        ..SessionConfig::default()
    };
    let (mut raw, mut host) = raw_pair(config);

    raw.send("join:").await;
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.decline_join().await.unwrap();
    assert_eq!(raw.recv().await, "join_ack:0");
    assert_eq!(host.session.state(), ProtocolState::Idle);

    raw.send("join:").await;
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.accept_join(puzzle()).unwrap();
    assert_eq!(raw.recv().await, "join_ack:1,4,0,0,1,1,3,1,3,1");
}

#[tokio::test]
async fn test_answering_without_pending_join_is_error() {
    let (_raw, host) = raw_pair(SessionConfig::default());
    assert!(matches!(
        host.session.accept_join(puzzle()),
        Err(SessionError::NothingPending("join"))
    ));
    assert!(matches!(
        host.session.decline_join().await,
        Err(SessionError::NothingPending("join"))
    ));
}

#[tokio::test]
async fn test_join_twice_is_invalid_state() {
    let (_raw, guest) = raw_pair(SessionConfig::default());
    guest.session.join().unwrap();
    assert!(matches!(
        guest.session.join(),
        Err(SessionError::InvalidState {
            state: ProtocolState::JoinRequested,
            ..
        })
    ));
}

// =========================================================================
// Filling
// =========================================================================

#[tokio::test]
async fn test_local_fill_reaches_peer_and_is_acknowledged() {
    let (mut guest, mut host) = joined().await;

    guest.session.fill(1, 0, 2).unwrap();

    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 2 }
    );
    assert_eq!(
        host.session.board().unwrap().get(1, 0).map(|e| e.value),
        Some(2)
    );
    assert_eq!(
        guest.next().await,
        SessionEvent::FillAcknowledged { x: 1, y: 0, value: 2 }
    );
}

#[tokio::test]
async fn test_rejected_local_fill_sends_nothing() {
    let (mut guest, mut host) = joined().await;

    // Row 0 already holds a 1.
    let err = guest.session.fill(2, 0, 1).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Move(MoveError::RowConflict { y: 0, value: 1 })
    ));
    assert!(matches!(
        guest.session.fill(0, 0, 2),
        Err(SessionError::Move(MoveError::FixedSquare { .. }))
    ));
    assert_eq!(guest.session.board().unwrap().get(2, 0), None);

    // The next event the host sees is the legal move that follows.
    guest.session.fill(2, 0, 2).unwrap();
    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 2, y: 0, value: 2 }
    );
}

#[tokio::test]
async fn test_clear_sends_zero_fill() {
    let (mut guest, mut host) = joined().await;

    guest.session.fill(1, 0, 2).unwrap();
    guest.session.clear(1, 0).unwrap();

    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 2 }
    );
    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 0 }
    );
    assert_eq!(host.session.board().unwrap().get(1, 0), None);
}

#[tokio::test]
async fn test_remote_fill_is_trusted_and_acknowledged() {
    let (mut raw, mut host) = raw_pair(SessionConfig::default());
    raw.send("join:").await;
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.accept_join(puzzle()).unwrap();
    let _ack = raw.recv().await;

    // Conflicts with the 1 in row 0, applied anyway.
    raw.send("fill:2,0,1").await;
    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 2, y: 0, value: 1 }
    );
    assert_eq!(raw.recv().await, "fill_ack:2,0,1");
}

#[tokio::test]
async fn test_remote_fill_before_joining_is_reported_and_dropped() {
    let (mut raw, mut host) = raw_pair(SessionConfig::default());

    raw.send("fill:0,0,1").await;
    raw.send("join:").await;

    // The fill was dropped; the join after it is still processed.
    assert_eq!(
        host.next().await,
        SessionEvent::FillIgnored { x: 0, y: 0, value: 1 }
    );
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    assert!(host.session.board().is_none());
    assert_eq!(host.session.state(), ProtocolState::Idle);
}

#[tokio::test]
async fn test_remote_fill_off_the_board_is_reported_and_not_acknowledged() {
    let (mut raw, mut host) = raw_pair(SessionConfig::default());
    raw.send("join:").await;
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    host.session.accept_join(puzzle()).unwrap();
    let _ack = raw.recv().await;

    raw.send("fill:9,9,1").await;
    raw.send("fill:1,0,2").await;

    assert_eq!(
        host.next().await,
        SessionEvent::FillIgnored { x: 9, y: 9, value: 1 }
    );
    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 2 }
    );
    assert_eq!(raw.recv().await, "fill_ack:1,0,2");
}

#[tokio::test]
async fn test_remote_fill_while_new_game_pending_applies_to_current_board() {
    let (mut guest, mut host) = joined().await;

    // The guest moves before it has seen the host's proposal.
    host.session.request_new_game(other_puzzle()).unwrap();
    guest.session.fill(1, 0, 2).unwrap();

    assert_eq!(
        host.next().await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 2 }
    );
    assert_eq!(host.session.state(), ProtocolState::NewGameRequested);

    assert!(matches!(
        guest.next().await,
        SessionEvent::NewGameRequested { .. }
    ));
    guest.session.decline_new_game().unwrap();
    assert_eq!(
        guest.next().await,
        SessionEvent::FillAcknowledged { x: 1, y: 0, value: 2 }
    );
    assert_eq!(host.next().await, SessionEvent::NewGameDeclined);

    assert_eq!(host.session.board(), guest.session.board());
    assert_eq!(
        host.session.board().unwrap().get(1, 0).map(|e| e.value),
        Some(2)
    );
}

#[tokio::test]
async fn test_fill_before_joining_is_invalid_state() {
    let (_raw, peer) = raw_pair(SessionConfig::default());
    assert!(matches!(
        peer.session.fill(0, 0, 1),
        Err(SessionError::InvalidState {
            state: ProtocolState::Idle,
            ..
        })
    ));
}

// =========================================================================
// New games
// =========================================================================

#[tokio::test]
async fn test_accepted_new_game_switches_both_boards() {
    let (mut guest, mut host) = joined().await;

    host.session.request_new_game(other_puzzle()).unwrap();
    assert_eq!(host.session.state(), ProtocolState::NewGameRequested);

    assert_eq!(
        guest.next().await,
        SessionEvent::NewGameRequested {
            board: other_puzzle()
        }
    );
    guest.session.accept_new_game().unwrap();
    assert_eq!(guest.session.board().unwrap().snapshot().unwrap(), other_puzzle());

    assert_eq!(
        host.next().await,
        SessionEvent::NewGameAccepted {
            board: other_puzzle()
        }
    );
    assert_eq!(host.session.state(), ProtocolState::Joined);
    assert_eq!(host.session.board().unwrap().snapshot().unwrap(), other_puzzle());
}

#[tokio::test]
async fn test_declined_new_game_keeps_current_board() {
    let (mut guest, mut host) = joined().await;

    host.session.request_new_game(other_puzzle()).unwrap();
    assert!(matches!(
        guest.next().await,
        SessionEvent::NewGameRequested { .. }
    ));
    guest.session.decline_new_game().unwrap();

    assert_eq!(host.next().await, SessionEvent::NewGameDeclined);
    assert_eq!(host.session.state(), ProtocolState::Joined);
    assert_eq!(host.session.board().unwrap().snapshot().unwrap(), puzzle());
    assert_eq!(guest.session.board().unwrap().snapshot().unwrap(), puzzle());
}

#[tokio::test]
async fn test_crossing_new_game_proposals_are_both_declined() {
    let (mut guest, mut host) = joined().await;

    host.session.request_new_game(other_puzzle()).unwrap();
    guest.session.request_new_game(other_puzzle()).unwrap();

    assert_eq!(host.next().await, SessionEvent::NewGameDeclined);
    assert_eq!(guest.next().await, SessionEvent::NewGameDeclined);
    assert_eq!(host.session.state(), ProtocolState::Joined);
    assert_eq!(guest.session.state(), ProtocolState::Joined);
}

#[tokio::test]
async fn test_accept_new_game_without_proposal_is_error() {
    let (guest, _host) = joined().await;
    assert!(matches!(
        guest.session.accept_new_game(),
        Err(SessionError::NothingPending("new game"))
    ));
}

// =========================================================================
// Warnings and disconnects
// =========================================================================

#[tokio::test]
async fn test_malformed_line_is_warning_and_connection_stays_open() {
    let (mut raw, mut host) = raw_pair(SessionConfig::default());

    raw.send("bogus_header:1,2,3").await;
    match host.next().await {
        SessionEvent::ProtocolWarning { line, .. } => {
            assert_eq!(line, "bogus_header:1,2,3");
        }
        other => panic!("expected a warning, got {other:?}"),
    }

    raw.send("join:").await;
    assert_eq!(host.next().await, SessionEvent::JoinRequested);
    assert_eq!(host.session.state(), ProtocolState::Idle);
}

#[tokio::test]
async fn test_dropped_stream_is_connection_lost() {
    let (raw, mut host) = raw_pair(SessionConfig::default());
    drop(raw);

    assert_eq!(
        host.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::ConnectionLost
        }
    );
    assert_eq!(host.session.state(), ProtocolState::Closed);
    host.assert_quiet().await;
}

#[tokio::test]
async fn test_close_is_final() {
    let (mut guest, _host) = joined().await;

    guest.session.close();
    guest.session.close();

    assert_eq!(
        guest.next().await,
        SessionEvent::Disconnected {
            reason: DisconnectReason::LocalClose
        }
    );
    guest.assert_quiet().await;
    assert!(guest.session.fill(1, 0, 2).is_err());
    guest.session.quit().await.unwrap();
}

#[tokio::test]
async fn test_sync_run_returns_when_peer_quits() {
    let (a, b) = tokio::io::duplex(4096);
    let (guest, _guest_events) = PeerSession::new(a, SessionConfig::default()).unwrap();
    let (host, mut host_events) = PeerSession::new(b, SessionConfig::default()).unwrap();
    guest.start().unwrap();

    guest.join().unwrap();
    guest.quit().await.unwrap();

    timeout(WAIT, host.run()).await.unwrap().unwrap();
    assert_eq!(host_events.recv().await, Some(SessionEvent::JoinRequested));
    assert_eq!(
        host_events.recv().await,
        Some(SessionEvent::Disconnected {
            reason: DisconnectReason::PeerQuit
        })
    );
}
