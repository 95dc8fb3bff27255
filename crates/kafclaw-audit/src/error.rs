//! Audit chain error types.

/// Errors from audit chain operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The underlying file could not be opened, locked, read, or written.
    #[error("audit file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An existing line in the file could not be parsed as JSON.
    ///
    /// Per spec §7 (`AuditChainCorruption`), this is surfaced to the caller
    /// and the append is refused — no automatic repair is attempted.
    #[error("audit chain corrupted at line {line}: {reason}")]
    ChainCorrupted {
        /// 1-indexed line number of the unparseable entry.
        line: usize,
        /// Why it failed to parse.
        reason: String,
    },

    /// Canonicalization or serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for audit chain operations.
pub type AuditResult<T> = Result<T, AuditError>;
