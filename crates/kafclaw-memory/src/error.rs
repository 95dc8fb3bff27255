//! Memory store error types.

/// Errors from memory chunk storage or observation/reflection.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The underlying KV store failed.
    #[error("storage error: {0}")]
    Storage(#[from] kafclaw_storage::StorageError),

    /// A stored row failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured text compressor (LLM collaborator) failed.
    #[error("compression failed: {0}")]
    CompressionFailed(String),
}

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
