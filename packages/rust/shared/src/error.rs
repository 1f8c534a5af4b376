//! Error types for Igniter.
//!
//! Library crates use [`IgniterError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all Igniter operations.
#[derive(Debug, thiserror::Error)]
pub enum IgniterError {
    /// Missing environment prerequisite or unreadable/malformed credentials
    /// store or app config.
    #[error("config error: {message}")]
    Config { message: String },

    /// Known-publishers load failure or file-sink write failure.
    #[error("persistence error at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Misuse of the port protocol (duplicate subscription, closed transport,
    /// undecodable wire data).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The worker could not be constructed or spawned.
    #[error("worker error: {0}")]
    Worker(String),

    /// The worker reported a fault over the `fault` port.
    #[error("worker fault: {message}")]
    WorkerFault { message: String },

    /// The worker stayed silent past the configured deadline.
    #[error("worker timed out after {after:?} without emitting an event")]
    WorkerTimeout { after: Duration },

    /// The run ended after an interrupt was forwarded to the worker.
    #[error("interrupted")]
    Interrupted,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IgniterError>;

impl IgniterError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Create a protocol error from any displayable message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether this error is a configuration problem.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
