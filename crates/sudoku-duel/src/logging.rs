//! Log output setup for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber filtered by `RUST_LOG`,
/// defaulting to `info`.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case the existing one stays in place.
///
/// Use `RUST_LOG=sudoku_duel_transport=debug` together with
/// `AdapterConfig::log_frames` to see every line on the wire.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .is_ok()
}
