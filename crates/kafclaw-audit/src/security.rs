//! The single entry point for security-relevant events (spec §4.12).
//!
//! `appendSecurityAuditEvent` writes policy, approval, install, and auth
//! events into `security-events.jsonl` under the state directory. Other
//! audit events (task completion, LLM/TOOL spans) go through
//! [`crate::AuditChain`] directly with their own file name; this module
//! exists because spec §4.12 calls out security events as needing one
//! dedicated, always-used entry point rather than letting each caller
//! pick its own file.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::chain::AuditChain;
use crate::error::AuditResult;

/// File name security events are written under, relative to the state dir.
pub const SECURITY_EVENTS_FILE: &str = "security-events.jsonl";

/// Recorder for security-relevant events: policy decisions, approval
/// transitions, skill installs, auth events.
#[derive(Debug, Clone)]
pub struct SecurityAuditRecorder {
    chain: AuditChain,
}

impl SecurityAuditRecorder {
    /// Create a recorder writing under `state_dir/security-events.jsonl`.
    #[must_use]
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            chain: AuditChain::new(PathBuf::from(state_dir.as_ref()).join(SECURITY_EVENTS_FILE)),
        }
    }

    /// The file path this recorder writes to.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.chain.path()
    }

    /// Append a security event. This is the *only* write path for
    /// policy/approval/install/auth events in this workspace.
    ///
    /// # Errors
    ///
    /// Returns an [`crate::AuditError`] if the append fails or the chain
    /// is found to be corrupted.
    pub async fn record(&self, event_type: impl Into<String>, payload: Value) -> AuditResult<()> {
        self.chain.append(event_type, payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_under_security_events_file() {
        let dir = tempdir().unwrap();
        let recorder = SecurityAuditRecorder::new(dir.path());
        recorder
            .record("policy_decision", json!({"tool": "write_file", "allowed": true}))
            .await
            .unwrap();
        assert!(dir.path().join(SECURITY_EVENTS_FILE).exists());
    }
}
