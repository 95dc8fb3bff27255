//! `sessions_spawn` built-in tool (spec §4.7 C8): the LLM-facing surface
//! for creating a sub-agent run. Registered by this crate against
//! [`kafclaw_tools::ToolRegistry`] directly, since `kafclaw-tools` cannot
//! depend on `kafclaw-runtime` without a cycle.

use std::sync::Arc;

use async_trait::async_trait;
use kafclaw_core::{SessionKey, Tier};
use kafclaw_tools::{BuiltinTool, ToolContext, ToolError, ToolResult};
use serde_json::{json, Value};

use crate::subagent::{CleanupPolicy, SpawnRequest, SubagentSupervisor};

/// Spawns a sub-agent run from within the Agent Loop's tool-call step.
pub struct SessionsSpawnTool {
    supervisor: Arc<SubagentSupervisor>,
}

impl SessionsSpawnTool {
    #[must_use]
    pub fn new(supervisor: Arc<SubagentSupervisor>) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl BuiltinTool for SessionsSpawnTool {
    fn name(&self) -> &'static str {
        "sessions_spawn"
    }

    fn description(&self) -> &'static str {
        "Spawn a sub-agent to work on a task independently and report back when done."
    }

    fn tier(&self) -> Tier {
        Tier::HighRisk
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The task the sub-agent should carry out."
                },
                "label": {
                    "type": "string",
                    "description": "Short label identifying this sub-agent's session, e.g. 'researcher'."
                },
                "cleanup": {
                    "type": "string",
                    "enum": ["keep", "delete"],
                    "description": "Whether the sub-agent's session is retained or deleted after it reports back. Defaults to 'keep'."
                }
            },
            "required": ["task", "label"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let turn = ctx.turn.as_ref().ok_or_else(|| {
            ToolError::ExecutionFailed("sessions_spawn requires turn identity, none was attached".to_string())
        })?;

        let task = args
            .get("task")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'task' string".to_string()))?;
        let label = args
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'label' string".to_string()))?;
        let cleanup = match args.get("cleanup").and_then(Value::as_str) {
            None | Some("keep") => CleanupPolicy::Keep,
            Some("delete") => CleanupPolicy::Delete,
            Some(other) => {
                return Err(ToolError::InvalidArguments(format!(
                    "invalid 'cleanup' value '{other}', expected 'keep' or 'delete'"
                )))
            }
        };

        let (channel, chat_id) = SessionKey(turn.session_key.clone())
            .split()
            .map_or_else(
                || (turn.channel.clone(), turn.chat_id.clone()),
                |(c, i)| (c.to_string(), i.to_string()),
            );

        let req = SpawnRequest {
            parent_session: SessionKey(turn.session_key.clone()),
            root_session: SessionKey(turn.session_key.clone()),
            requester_channel: channel,
            requester_chat_id: chat_id,
            requester_trace: turn.trace_id,
            task: task.to_string(),
            label: label.to_string(),
            parent_depth: turn.depth,
            cleanup,
        };

        let run = self
            .supervisor
            .spawn(req, chrono::Utc::now())
            .await
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;

        Ok(format!(
            "Spawned sub-agent '{}' as {}. It will report back when done.",
            label, run.run_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use kafclaw_bus::OutboundBus;
    use kafclaw_core::TraceId;
    use kafclaw_storage::MemoryKvStore;
    use kafclaw_tools::TurnIdentity;
    use std::path::PathBuf;

    fn tool_ctx(depth: u32) -> ToolContext {
        ToolContext::new(PathBuf::from("/tmp")).with_turn(TurnIdentity {
            trace_id: TraceId::new(),
            channel: "cli".to_string(),
            chat_id: "c1".to_string(),
            session_key: "cli:c1".to_string(),
            depth,
        })
    }

    fn supervisor() -> Arc<SubagentSupervisor> {
        let backend: Arc<dyn kafclaw_storage::KvStore> = Arc::new(MemoryKvStore::new());
        let sessions = Arc::new(SessionStore::new(backend.clone()));
        Arc::new(SubagentSupervisor::new(backend, sessions, Arc::new(OutboundBus::new())))
    }

    #[tokio::test]
    async fn spawns_with_valid_arguments() {
        let tool = SessionsSpawnTool::new(supervisor());
        let ctx = tool_ctx(0);
        let result = tool
            .execute(json!({"task": "dig up the logs", "label": "digger"}), &ctx)
            .await
            .unwrap();
        assert!(result.contains("digger"));
    }

    #[tokio::test]
    async fn rejects_missing_task() {
        let tool = SessionsSpawnTool::new(supervisor());
        let ctx = tool_ctx(0);
        let err = tool.execute(json!({"label": "digger"}), &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn rejects_missing_turn_identity() {
        let tool = SessionsSpawnTool::new(supervisor());
        let ctx = ToolContext::new(PathBuf::from("/tmp"));
        let err = tool
            .execute(json!({"task": "x", "label": "y"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn rejects_depth_beyond_supervisor_limit() {
        let sup = supervisor();
        let tool = SessionsSpawnTool::new(sup);
        let ctx = tool_ctx(DEFAULT_MAX_DEPTH_FOR_TEST);
        let err = tool
            .execute(json!({"task": "x", "label": "y"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }

    const DEFAULT_MAX_DEPTH_FOR_TEST: u32 = crate::subagent::DEFAULT_MAX_DEPTH;
}
