//! `list_directory` — tier 0 (read-only).

use kafclaw_core::Tier;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

/// Lists immediate children of a directory within the workspace.
pub struct ListDirectoryTool;

#[async_trait::async_trait]
impl BuiltinTool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List the immediate contents of a directory."
    }

    fn tier(&self) -> Tier {
        Tier::Read
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Directory path, defaults to the current directory." }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or(".");
        let resolved = ctx.resolve(path).await?;
        if !resolved.exists() {
            return Err(ToolError::PathNotFound(path.to_string()));
        }
        let mut entries = tokio::fs::read_dir(&resolved).await.map_err(ToolError::Io)?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ToolError::Io)? {
            let marker = if entry.path().is_dir() { "/" } else { "" };
            names.push(format!("{}{marker}", entry.file_name().to_string_lossy()));
        }
        names.sort();
        Ok(names.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_marks_directories() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "").await.unwrap();
        tokio::fs::create_dir(dir.path().join("a_dir")).await.unwrap();
        let ctx = ToolContext::new(dir.path().to_path_buf());
        let out = ListDirectoryTool
            .execute(serde_json::json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, "a_dir/\nb.txt");
    }
}
