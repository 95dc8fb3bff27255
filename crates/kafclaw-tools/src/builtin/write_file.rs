//! `write_file` — tier 1 (write).

use kafclaw_core::Tier;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

/// Writes (creating or overwriting) a UTF-8 text file within the workspace.
pub struct WriteFileTool;

#[async_trait::async_trait]
impl BuiltinTool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Write text content to a file, creating parent directories as needed."
    }

    fn tier(&self) -> Tier {
        Tier::Write
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "content": { "type": "string" }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'path'".to_string()))?;
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'content'".to_string()))?;
        let resolved = ctx.resolve(path).await?;
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ToolError::Io)?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(ToolError::Io)?;
        Ok(format!("wrote {} bytes to {path}", content.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_file_creating_parents() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let out = WriteFileTool
            .execute(
                serde_json::json!({"path": "nested/a.txt", "content": "hi"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(out.contains("wrote"));
        let written = tokio::fs::read_to_string(dir.path().join("nested/a.txt"))
            .await
            .unwrap();
        assert_eq!(written, "hi");
    }

    #[tokio::test]
    async fn missing_content_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let err = WriteFileTool
            .execute(serde_json::json!({"path": "a.txt"}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
