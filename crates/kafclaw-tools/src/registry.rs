//! The `BuiltinTool` trait and the registry that dispatches by name.

use std::collections::HashMap;

use kafclaw_core::Tier;
use serde_json::Value;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};

/// Bytes a tool result is capped at when written into logging metadata
/// (audit / tracing events). The *LLM-facing* result is never truncated —
/// only the copy that lands in logs (spec §4.2).
pub const LOG_TRUNCATION_BYTES: usize = 10 * 1024;

/// A tool the Agent Loop can name-dispatch to from an LLM tool call.
#[async_trait::async_trait]
pub trait BuiltinTool: Send + Sync {
    /// Tool name as it appears in LLM tool-call requests. Never contains a
    /// colon — `kafclaw-runtime` uses a colon to distinguish MCP-style
    /// `server:tool` names from built-ins (spec §4.2 uses the same rule
    /// implicitly via the registry's name-based dispatch).
    fn name(&self) -> &'static str;

    /// Human-readable description surfaced to the LLM.
    fn description(&self) -> &'static str;

    /// Severity tier this tool's side effects fall under.
    fn tier(&self) -> Tier;

    /// JSON schema describing this tool's arguments.
    fn parameters(&self) -> Value;

    /// Run the tool against `args` within `ctx`.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult;
}

/// A tool definition shaped for LLM tool-list serialization.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Description shown to the LLM.
    pub description: String,
    /// Tier, surfaced so the LLM (and operators) can see the risk class.
    pub tier: Tier,
    /// JSON schema for arguments.
    pub parameters: Value,
}

/// Registry of built-in tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn BuiltinTool>>,
}

impl ToolRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with the standard built-in tool set registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::builtin::ReadFileTool));
        registry.register(Box::new(crate::builtin::WriteFileTool));
        registry.register(Box::new(crate::builtin::ListDirectoryTool));
        registry.register(Box::new(crate::builtin::ExecTool));
        registry
    }

    /// Register (or replace) a tool.
    pub fn register(&mut self, tool: Box<dyn BuiltinTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn BuiltinTool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// A name with no colon refers to a built-in; anything else is routed
    /// elsewhere (e.g. MCP) by the caller.
    #[must_use]
    pub fn is_builtin(name: &str) -> bool {
        !name.contains(':')
    }

    /// Dispatch by name, returning [`ToolError::UnknownTool`] on a miss.
    pub async fn dispatch(&self, name: &str, args: Value, ctx: &ToolContext) -> ToolResult {
        match self.get(name) {
            Some(tool) => tool.execute(args, ctx).await,
            None => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// All tool definitions, for LLM tool-list serialization.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                tier: t.tier(),
                parameters: t.parameters(),
            })
            .collect()
    }
}

/// Cap a tool result for logging/audit metadata without touching the copy
/// returned to the LLM (spec §4.2: "capped for logging... but never
/// truncated for the LLM").
#[must_use]
pub fn truncate_for_log(result: &str) -> String {
    if result.len() <= LOG_TRUNCATION_BYTES {
        return result.to_string();
    }
    let mut boundary = LOG_TRUNCATION_BYTES;
    while !result.is_char_boundary(boundary) {
        boundary -= 1;
    }
    let mut truncated = result[..boundary].to_string();
    truncated.push_str("... (truncated for log)");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_builtin_distinguishes_mcp_names() {
        assert!(ToolRegistry::is_builtin("read_file"));
        assert!(!ToolRegistry::is_builtin("filesystem:read_file"));
    }

    #[test]
    fn with_defaults_registers_expected_tools() {
        let registry = ToolRegistry::with_defaults();
        for name in ["read_file", "write_file", "list_directory", "exec"] {
            assert!(registry.get(name).is_some(), "missing tool {name}");
        }
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn truncate_for_log_leaves_small_results_untouched() {
        let small = "ok".to_string();
        assert_eq!(truncate_for_log(&small), small);
    }

    #[test]
    fn truncate_for_log_caps_large_results() {
        let large = "x".repeat(LOG_TRUNCATION_BYTES * 2);
        let truncated = truncate_for_log(&large);
        assert!(truncated.len() < large.len());
        assert!(truncated.contains("truncated for log"));
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_errors() {
        let registry = ToolRegistry::with_defaults();
        let ctx = ToolContext::new(std::env::temp_dir());
        let err = registry
            .dispatch("does_not_exist", serde_json::json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(_)));
    }
}
