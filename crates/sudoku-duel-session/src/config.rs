//! Session configuration.

use serde::{Deserialize, Serialize};
use sudoku_duel_transport::AdapterConfig;

/// Configuration for a [`PeerSession`](crate::PeerSession).
///
/// ```
/// use sudoku_duel_session::SessionConfig;
///
/// let config = SessionConfig {
///     close_after_join_decline: false,
///     ..SessionConfig::default()
/// };
/// assert!(!config.adapter.log_frames);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Settings for the underlying connection.
    pub adapter: AdapterConfig,

    /// Whether a host that declines a join also closes the connection.
    ///
    /// Default: `true`. A declined peer has nothing left to do on the
    /// connection, and it closes its own side on receiving the decline.
    pub close_after_join_decline: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterConfig::default(),
            close_after_join_decline: true,
        }
    }
}

impl SessionConfig {
    /// Returns a copy with every nested config validated.
    pub fn validated(mut self) -> Self {
        self.adapter = self.adapter.validated();
        self
    }
}
