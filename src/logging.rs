//! Tracing subscriber setup for the `flashctl` binary.
//!
//! Logs go to stderr so report output on stdout stays clean. `RUST_LOG`
//! overrides the level chosen from the verbosity flag.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Raised when the filter directive cannot be parsed.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Raised when a global subscriber is already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Maps the number of `--verbose` flags to a level.
#[must_use]
pub const fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a compact stderr subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already set.
pub fn init(verbosity: u8) -> Result<(), LoggingError> {
    let level = level_for(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("flashctl={level}")))
        .map_err(|err| LoggingError::Filter(err.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}
