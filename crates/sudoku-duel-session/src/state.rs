//! Protocol states of a peer session.

use std::fmt;

/// Where a session stands in the two-party negotiation.
///
/// ```text
///   Idle ──(join)──→ JoinRequested ──(accepted)──→ Joined ⇄ NewGameRequested
///    │                    │                          │
///    │               (declined)                      │
///    ▼                    ▼                          ▼
///  Closed ←───────────────┴───── quit / connection lost
/// ```
///
/// A host stays in `Idle` until it accepts a join, then moves straight to
/// `Joined`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Idle,
    JoinRequested,
    Joined,
    NewGameRequested,
    Closed,
}

impl ProtocolState {
    /// `true` while a shared board is in play.
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Joined | Self::NewGameRequested)
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::JoinRequested => "join requested",
            Self::Joined => "joined",
            Self::NewGameRequested => "new game requested",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
