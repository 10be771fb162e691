use std::time::Duration;

use rand::seq::IndexedRandom;
use sudoku_duel::prelude::*;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Puzzle
// ---------------------------------------------------------------------------

/// A 4x4 puzzle with one solution:
///
/// ```text
/// 1 2 | 3 4
/// 3 4 | 1 2
/// ----+----
/// 2 1 | 4 3
/// 4 3 | 2 1
/// ```
fn puzzle() -> Result<BoardSnapshot, SudokuDuelError> {
    let clues = [
        (0, 0, 1),
        (3, 0, 4),
        (1, 1, 4),
        (2, 1, 1),
        (0, 2, 2),
        (3, 2, 3),
        (1, 3, 3),
        (2, 3, 2),
    ];
    let squares = clues
        .iter()
        .map(|&(x, y, value)| Square::clue(x, y, value))
        .collect();
    Ok(BoardSnapshot::new(4, squares)?)
}

/// Picks a random legal move on an empty square, if any is left.
fn pick_move(board: &Board) -> Option<(u32, u32, u32)> {
    let size = board.size();
    let moves: Vec<_> = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .filter(|&(x, y)| board.get(x, y).is_none())
        .flat_map(|(x, y)| (1..=size).map(move |v| (x, y, v)))
        .filter(|&(x, y, v)| board.check_move(x, y, v).is_ok())
        .collect();
    moves.choose(&mut rand::rng()).copied()
}

// ---------------------------------------------------------------------------
// Host mode
// ---------------------------------------------------------------------------

/// Serves the built-in puzzle to one peer at a time.
async fn host(builder: PeerBuilder, addr: &str) -> Result<(), SudokuDuelError> {
    let host = builder.host(addr).await?;
    info!(addr = %host.local_addr()?, "hosting");

    loop {
        let (session, mut events, peer) = host.accept().await?;
        info!(%peer, "peer connected");

        while let Some(event) = events.recv().await {
            if !serve(&session, event) {
                break;
            }
        }
    }
}

/// Reacts to one event from the guest. Returns `false` once the guest is
/// gone.
///
/// The guest may leave before we answer it, so a failed answer is logged
/// and the host keeps going.
fn serve(session: &PeerSession, event: SessionEvent) -> bool {
    let answer = match event {
        SessionEvent::JoinRequested => puzzle().and_then(|board| {
            session.accept_join(board).map_err(SudokuDuelError::from)
        }),
        SessionEvent::NewGameRequested { .. } => {
            session.accept_new_game().map_err(SudokuDuelError::from)
        }
        SessionEvent::RemoteFill { x, y, value } => {
            let left = session.board().map_or(0, |b| b.empty_count());
            info!(x, y, value, left, "peer filled a square");
            Ok(())
        }
        SessionEvent::FillIgnored { x, y, value } => {
            warn!(x, y, value, "peer fill ignored");
            Ok(())
        }
        SessionEvent::ProtocolWarning { line, reason } => {
            warn!(%line, %reason, "peer sent a bad line");
            Ok(())
        }
        SessionEvent::Disconnected { reason } => {
            info!(?reason, "peer left");
            return false;
        }
        _ => Ok(()),
    };
    if let Err(e) = answer {
        warn!(conn = %session.id(), error = %e, "could not answer the peer");
    }
    true
}

// ---------------------------------------------------------------------------
// Join mode
// ---------------------------------------------------------------------------

/// Joins a host and fills random legal squares until none are left.
async fn join(builder: PeerBuilder, addr: &str) -> Result<(), SudokuDuelError> {
    let (session, mut events) = builder.connect(addr).await?;
    session.join()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SessionEvent::JoinAccepted { board }) => {
                    info!(size = board.size(), "joined");
                }
                Some(SessionEvent::JoinDeclined) => info!("host declined"),
                Some(SessionEvent::Disconnected { reason }) => {
                    info!(?reason, "disconnected");
                    return Ok(());
                }
                Some(other) => info!(?other, "event"),
                None => return Ok(()),
            },
            _ = ticker.tick(), if session.state() == ProtocolState::Joined => {
                let Some(board) = session.board() else { continue };
                match pick_move(&board) {
                    Some((x, y, value)) => {
                        session.fill(x, y, value)?;
                        info!(x, y, value, "filled a square");
                    }
                    None => {
                        let left = board.empty_count();
                        info!(left, solved = board.is_full(), "no moves left, quitting");
                        session.quit().await?;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

const USAGE: &str = "usage: headless-peer <host|join> <addr> [config.json]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sudoku_duel::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (mode, addr) = match args.as_slice() {
        [mode, addr, ..] => (mode.as_str(), addr.as_str()),
        _ => return Err(USAGE.into()),
    };

    let mut builder = PeerBuilder::new();
    if let Some(path) = args.get(2) {
        builder = builder.config_file(path)?;
    }

    match mode {
        "host" => host(builder, addr).await?,
        "join" => join(builder, addr).await?,
        _ => return Err(USAGE.into()),
    }
    Ok(())
}
