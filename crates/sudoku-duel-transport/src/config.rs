//! Adapter configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for a [`NetworkAdapter`](crate::NetworkAdapter).
///
/// Missing fields fall back to their defaults when deserialized, so a
/// config file only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Longest inbound line accepted, in bytes, excluding the terminator.
    /// Longer lines are discarded and surfaced as `Malformed`.
    ///
    /// Default: 64 KiB, enough for a fully listed 25x25 board.
    pub max_line_len: usize,

    /// Log every line sent (`>`) and received (`<`) at `debug` level.
    pub log_frames: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_line_len: 64 * 1024,
            log_frames: false,
        }
    }
}

impl AdapterConfig {
    /// Smallest allowed `max_line_len`.
    pub const MIN_LINE_LEN: usize = 64;
    /// Largest allowed `max_line_len`.
    pub const MAX_LINE_LEN: usize = 1024 * 1024;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`NetworkAdapter::with_config`](crate::NetworkAdapter::with_config).
    pub fn validated(mut self) -> Self {
        let clamped = self
            .max_line_len
            .clamp(Self::MIN_LINE_LEN, Self::MAX_LINE_LEN);
        if clamped != self.max_line_len {
            warn!(
                requested = self.max_line_len,
                clamped, "max_line_len out of range, clamping"
            );
            self.max_line_len = clamped;
        }
        self
    }
}
