//! Expertise tracker error types.

/// Errors from recording or reading skill events.
#[derive(Debug, thiserror::Error)]
pub enum ExpertiseError {
    /// The underlying KV store failed.
    #[error("storage error: {0}")]
    Storage(#[from] kafclaw_storage::StorageError),

    /// A stored row failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for expertise operations.
pub type ExpertiseResult<T> = Result<T, ExpertiseError>;
