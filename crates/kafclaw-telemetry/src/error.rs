//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while configuring or initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The supplied [`crate::LogConfig`] could not be turned into a filter
    /// or writer (bad level string, malformed directive, unwritable log
    /// directory).
    #[error("telemetry configuration error: {0}")]
    ConfigError(String),

    /// The global `tracing` subscriber could not be installed (usually
    /// because one was already installed by this process).
    #[error("telemetry initialization error: {0}")]
    InitError(String),

    /// Filesystem I/O failed while preparing file-based logging.
    #[error("telemetry I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
