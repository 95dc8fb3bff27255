//! Tool execution error types.

/// Errors a built-in tool can surface from `execute`.
///
/// Per spec §4.6/§7, a [`ToolError`] never aborts the Agent Loop: the
/// caller converts it into a tool-role message `"Error: <message>"` and the
/// turn continues so the LLM can recover or surrender.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arguments failed schema/semantic validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool ran but failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Referenced path does not exist.
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Tool exceeded its allotted time.
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Dispatch was attempted against a name not present in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Result type for tool execution.
pub type ToolResult = Result<String, ToolError>;
