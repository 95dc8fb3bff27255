//! Scheduler and delivery-worker error types.

/// Errors from scheduler ticks or delivery-retry passes.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The process-level lock file could not be opened.
    #[error("failed to open scheduler lock file: {0}")]
    LockFile(#[from] std::io::Error),

    /// The bus rejected a synthetic inbound publish.
    #[error("failed to publish scheduled job's synthetic message: {0}")]
    Bus(#[from] kafclaw_bus::BusError),

    /// A delivery sink collaborator failed.
    #[error("delivery sink error: {0}")]
    Delivery(String),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
