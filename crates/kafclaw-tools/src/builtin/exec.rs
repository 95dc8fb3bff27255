//! `exec` — tier 2 (high-risk): runs an arbitrary shell command.

use std::path::PathBuf;

use kafclaw_core::Tier;
use serde_json::Value;
use tokio::process::Command;

use crate::context::ToolContext;
use crate::error::{ToolError, ToolResult};
use crate::registry::BuiltinTool;

const DEFAULT_TIMEOUT_MS: u64 = 120_000;
const MAX_TIMEOUT_MS: u64 = 600_000;
const CWD_SENTINEL: &str = "__KAFCLAW_CWD__";

/// Executes a shell command, persisting the working directory across calls
/// within one session (a `cd` in one `exec` call is visible to the next).
pub struct ExecTool;

#[async_trait::async_trait]
impl BuiltinTool for ExecTool {
    fn name(&self) -> &'static str {
        "exec"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command. The working directory persists between calls."
    }

    fn tier(&self) -> Tier {
        Tier::HighRisk
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": { "type": "string" },
                "timeout_ms": { "type": "integer" }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> ToolResult {
        let command = args
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing 'command'".to_string()))?;
        let timeout_ms = args
            .get("timeout_ms")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
            .min(MAX_TIMEOUT_MS);

        let cwd = ctx.cwd.read().await.clone();
        let wrapped =
            format!("{command}\n__KAFCLAW_EXIT__=$?\necho \"{CWD_SENTINEL}\"\npwd\nexit $__KAFCLAW_EXIT__");

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            run_shell(&wrapped, &cwd),
        )
        .await;

        match outcome {
            Ok(Ok((stdout, stderr, exit_code))) => {
                let (output, new_cwd) = split_on_sentinel(&stdout);
                if let Some(new_cwd) = new_cwd {
                    *ctx.cwd.write().await = new_cwd;
                }

                let mut text = output;
                if !stderr.is_empty() {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str("STDERR:\n");
                    text.push_str(&stderr);
                }
                if exit_code != 0 {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&format!("(exit code: {exit_code})"));
                }
                if text.is_empty() {
                    text.push_str("(no output)");
                }
                Ok(text)
            }
            Ok(Err(e)) => Err(ToolError::ExecutionFailed(e.to_string())),
            Err(_) => Err(ToolError::Timeout(timeout_ms)),
        }
    }
}

async fn run_shell(command: &str, cwd: &std::path::Path) -> std::io::Result<(String, String, i32)> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .output()
        .await?;
    Ok((
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    ))
}

fn split_on_sentinel(stdout: &str) -> (String, Option<PathBuf>) {
    match stdout.find(CWD_SENTINEL) {
        Some(pos) => {
            let output = stdout[..pos].trim_end().to_string();
            let after = &stdout[pos + CWD_SENTINEL.len()..];
            let new_cwd = after
                .lines()
                .find(|l| !l.is_empty())
                .map(|l| PathBuf::from(l.trim()));
            (output, new_cwd)
        }
        None => (stdout.to_string(), None),
    }
}
