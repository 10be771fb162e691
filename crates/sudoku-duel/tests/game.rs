//! End-to-end test: a host and a guest play over loopback TCP.

use std::time::Duration;

use sudoku_duel::prelude::*;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn next(events: &mut SessionEvents) -> SessionEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

fn puzzle() -> BoardSnapshot {
    BoardSnapshot::new(
        4,
        vec![
            Square::clue(0, 0, 1),
            Square::clue(1, 1, 3),
            Square::clue(2, 2, 4),
            Square::clue(3, 3, 2),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_host_and_guest_play_a_move_then_guest_quits() {
    let host = PeerBuilder::new().log_frames(true).host("127.0.0.1:0").await.unwrap();
    let addr = host.local_addr().unwrap();

    let accept = tokio::spawn(async move { host.accept().await });
    let (guest, mut guest_events) = PeerBuilder::new().connect(addr).await.unwrap();
    let (host_session, mut host_events, _) = accept.await.unwrap().unwrap();

    // Join.
    guest.join().unwrap();
    assert_eq!(next(&mut host_events).await, SessionEvent::JoinRequested);
    host_session.accept_join(puzzle()).unwrap();
    assert_eq!(
        next(&mut guest_events).await,
        SessionEvent::JoinAccepted { board: puzzle() }
    );

    // One move each way.
    guest.fill(1, 0, 2).unwrap();
    assert_eq!(
        next(&mut host_events).await,
        SessionEvent::RemoteFill { x: 1, y: 0, value: 2 }
    );
    host_session.fill(3, 0, 3).unwrap();
    assert_eq!(
        next(&mut guest_events).await,
        SessionEvent::FillAcknowledged { x: 1, y: 0, value: 2 }
    );
    assert_eq!(
        next(&mut guest_events).await,
        SessionEvent::RemoteFill { x: 3, y: 0, value: 3 }
    );
    assert_eq!(guest.board(), host_session.board());

    // Quit.
    guest.quit().await.unwrap();
    loop {
        match next(&mut host_events).await {
            SessionEvent::Disconnected { reason } => {
                assert_eq!(reason, DisconnectReason::PeerQuit);
                break;
            }
            SessionEvent::FillAcknowledged { .. } => continue,
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(host_session.state(), ProtocolState::Closed);
}

#[tokio::test]
async fn test_errors_convert_into_top_level_error() {
    async fn guest_fill_too_early() -> Result<(), SudokuDuelError> {
        let (a, _b) = tokio::io::duplex(64);
        let (session, _events) = PeerBuilder::new().attach(a)?;
        session.fill(0, 0, 1)?;
        Ok(())
    }

    let err = guest_fill_too_early().await.unwrap_err();
    assert!(matches!(
        err,
        SudokuDuelError::Session(SessionError::InvalidState { .. })
    ));
}
