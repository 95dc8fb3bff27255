//! `read_file` — tier 0 (read-only).

use kafclaw_core::Tier;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

/// Reads a UTF-8 text file within the workspace.
pub struct ReadFileTool;

#[async_trait::async_trait]
impl BuiltinTool for ReadFileTool {
    fn name(&self) -> &'static str {
        "read_file"
    }

    fn description(&self) -> &'static str {
        "Read the contents of a text file."
    }

    fn tier(&self) -> Tier {
        Tier::Read
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Path relative to the workspace root." }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'path'".to_string()))?;
        let resolved = ctx.resolve(path).await?;
        if !resolved.exists() {
            return Err(ToolError::PathNotFound(path.to_string()));
        }
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(ToolError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello")
            .await
            .unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let out = ReadFileTool
            .execute(serde_json::json!({"path": "a.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let err = ReadFileTool
            .execute(serde_json::json!({"path": "missing.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::PathNotFound(_)));
    }
}
