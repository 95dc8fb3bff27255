//! Runtime error taxonomy (spec §7).
//!
//! One variant per error kind spec §7 names; lower-crate errors are
//! wrapped verbatim via `#[from]` rather than re-stringified, so callers
//! can still match on the underlying cause where it matters (e.g.
//! `RuntimeError::Audit(AuditError::ChainCorrupted { .. })`).

use kafclaw_core::{ApprovalId, RunId, TaskId};

/// Errors the Agent Loop, Sub-agent Supervisor, or their stores can raise.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A required inbound message field was missing or malformed. Nothing
    /// is persisted for these (spec §7: "rejected at ingress").
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// The underlying KV store failed.
    #[error("storage error: {0}")]
    Storage(#[from] kafclaw_storage::StorageError),

    /// The audit chain failed to append, or was found corrupted.
    #[error("audit error: {0}")]
    Audit(#[from] kafclaw_audit::AuditError),

    /// The approval manager rejected an operation (unknown id).
    #[error("approval error: {0}")]
    Approval(#[from] kafclaw_approval::ApprovalError),

    /// A tool execution failed. Per spec §7 this never aborts a turn —
    /// callers format it into a tool-role message instead of propagating
    /// it; this variant exists for the rare case a caller needs to
    /// surface it directly (e.g. sub-agent spawn rejection).
    #[error("tool execution error: {0}")]
    ToolExecution(#[from] kafclaw_tools::ToolError),

    /// The configured LLM transport failed. Propagates up per spec §7
    /// (`LLMTransportError`): the task is marked failed and delivery
    /// never happens.
    #[error("LLM transport error: {0}")]
    LlmTransport(#[from] kafclaw_llm::LlmError),

    /// A memory store or observer/reflector operation failed.
    #[error("memory error: {0}")]
    Memory(#[from] kafclaw_memory::MemoryError),

    /// An expertise tracker write failed.
    #[error("expertise error: {0}")]
    Expertise(#[from] kafclaw_expertise::ExpertiseError),

    /// The scheduler or delivery worker failed.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] kafclaw_scheduler::SchedulerError),

    /// The daily token quota was exceeded; the loop short-circuits with a
    /// fixed message rather than calling the LLM (spec §7 `QuotaExceeded`).
    #[error("daily token quota exceeded")]
    QuotaExceeded,

    /// An approval request referenced an id this process never created.
    #[error("unknown approval id: {0}")]
    UnknownApproval(ApprovalId),

    /// A sub-agent spawn was rejected (depth or concurrency cap).
    #[error("subagent overflow: {0}")]
    SubagentOverflow(String),

    /// Two tasks collided on the same idempotency key at insert time; the
    /// caller should treat this as a dedup hit rather than an error.
    #[error("duplicate idempotency key for task {0}")]
    DuplicateTask(TaskId),

    /// Referenced a task id that does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// Referenced a sub-agent run id that does not exist.
    #[error("unknown subagent run: {0}")]
    UnknownSubagentRun(RunId),

    /// A JSON (de)serialization step failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
