//! Policy error types.

/// Errors from policy evaluation.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// The policy decision could not be persisted.
    #[error("failed to persist policy decision: {0}")]
    PersistenceFailed(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
