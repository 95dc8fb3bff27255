//! Shared execution context passed to every built-in tool invocation.

use std::path::PathBuf;
use std::sync::Arc;

use kafclaw_core::TraceId;
use tokio::sync::RwLock;

/// Turn identity a tool can read back, for tools whose behavior depends on
/// who is calling and how deep the sub-agent nesting already is (currently
/// only `sessions_spawn`, registered by `kafclaw-runtime`). Absent for
/// tests and callers that never spawn sub-agents.
#[derive(Debug, Clone)]
pub struct TurnIdentity {
    /// Trace this tool call is running under.
    pub trace_id: TraceId,
    /// Originating channel of the turn.
    pub channel: String,
    /// Originating chat id of the turn.
    pub chat_id: String,
    /// `channel:chat_id` session key of the turn.
    pub session_key: String,
    /// Sub-agent nesting depth of the *caller* (0 for a top-level turn).
    pub depth: u32,
}

/// Context shared across all tool calls within one session.
///
/// `cwd` is shared via `Arc<RwLock<_>>` so a `bash` tool's `cd` persists
/// across invocations within the same session, mirroring the teacher's
/// `ToolContext::cwd` field.
#[derive(Clone)]
pub struct ToolContext {
    /// Root directory tool paths are resolved relative to and confined within.
    pub workspace_root: PathBuf,
    /// Current working directory, shared across invocations in one session.
    pub cwd: Arc<RwLock<PathBuf>>,
    /// Turn identity, when the caller is the Agent Loop rather than a test
    /// or a context with no notion of sessions/depth.
    pub turn: Option<TurnIdentity>,
}

impl ToolContext {
    /// Build a context rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: PathBuf) -> Self {
        let cwd = Arc::new(RwLock::new(workspace_root.clone()));
        Self { workspace_root, cwd, turn: None }
    }

    /// Build a context that shares its `cwd` with another session (e.g. a
    /// sub-agent inheriting the parent's working directory).
    #[must_use]
    pub fn with_shared_cwd(workspace_root: PathBuf, cwd: Arc<RwLock<PathBuf>>) -> Self {
        Self { workspace_root, cwd, turn: None }
    }

    /// Attach turn identity, returning `self` for chaining.
    #[must_use]
    pub fn with_turn(mut self, turn: TurnIdentity) -> Self {
        self.turn = Some(turn);
        self
    }

    /// Resolve `path` relative to the current `cwd`, rejecting anything that
    /// escapes `workspace_root`.
    pub async fn resolve(&self, path: &str) -> Result<PathBuf, crate::error::ToolError> {
        let cwd = self.cwd.read().await.clone();
        let candidate = cwd.join(path);
        let root = self
            .workspace_root
            .canonicalize()
            .unwrap_or_else(|_| self.workspace_root.clone());
        let resolved = if candidate.exists() {
            candidate
                .canonicalize()
                .map_err(crate::error::ToolError::Io)?
        } else {
            candidate.clone()
        };
        if resolved.starts_with(&root) || candidate.starts_with(&root) {
            Ok(candidate)
        } else {
            Err(crate::error::ToolError::InvalidArguments(format!(
                "path '{path}' escapes workspace root"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_relative_path_within_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let resolved = ctx.resolve("notes.txt").await.unwrap();
        assert_eq!(resolved, dir.path().join("notes.txt"));
    }

    #[tokio::test]
    async fn rejects_path_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let err = ctx.resolve("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, crate::error::ToolError::InvalidArguments(_)));
    }
}
