//! Approval manager error types.

use kafclaw_core::ApprovalId;

/// Errors from approval operations.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// `respond`/`wait` was called with an id that was never created.
    #[error("unknown approval id: {0}")]
    UnknownApproval(ApprovalId),
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
