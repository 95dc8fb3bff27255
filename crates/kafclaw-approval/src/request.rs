//! Approval request types and state (spec §3 `ApprovalRequest`).

use chrono::{DateTime, Utc};
use kafclaw_core::{ApprovalId, ChatKey, TaskId, Tier, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal and non-terminal states of one approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    /// Waiting for a user response.
    Pending,
    /// The user approved the action.
    Approved,
    /// The user denied the action.
    Denied,
    /// No response arrived before the deadline.
    Timeout,
}

impl ApprovalState {
    /// Whether this state is terminal (no further transitions possible).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A request for human approval of a tool call (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Short random token the user replies with (`approve:<id>` / `deny:<id>`).
    pub approval_id: ApprovalId,
    /// Tool awaiting approval.
    pub tool: String,
    /// Tier of that tool.
    pub tier: Tier,
    /// Arguments the tool was called with.
    pub arguments: Value,
    /// Sender who must approve.
    pub sender: String,
    /// Channel the approval prompt is sent on.
    pub channel: String,
    /// Chat the approval prompt is sent to.
    pub chat_id: ChatKey,
    /// Trace this approval belongs to.
    pub trace_id: TraceId,
    /// Task this approval belongs to.
    pub task_id: TaskId,
    /// Current state of the request.
    pub state: ApprovalState,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request reached a terminal state, if it has.
    pub responded_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// Build a new pending approval request.
    #[must_use]
    pub fn new(
        tool: impl Into<String>,
        tier: Tier,
        arguments: Value,
        sender: impl Into<String>,
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        trace_id: TraceId,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            approval_id: ApprovalId::generate(),
            tool: tool.into(),
            tier,
            arguments,
            sender: sender.into(),
            channel: channel.into(),
            chat_id: chat_id.into(),
            trace_id,
            task_id,
            state: ApprovalState::Pending,
            created_at: now,
            responded_at: None,
        }
    }

    /// Current state of this request.
    #[must_use]
    pub fn state_field(&self) -> ApprovalState {
        self.state
    }

    /// Transition to a new state, stamping `responded_at` if it is terminal.
    pub fn set_state(&mut self, state: ApprovalState) {
        self.state = state;
        if state.is_terminal() {
            self.responded_at = Some(Utc::now());
        }
    }

    /// The user-facing prompt text for this request (spec §6: must contain
    /// the literal substring `requires approval` plus both reply hints).
    #[must_use]
    pub fn prompt_text(&self, truncated_args: &str) -> String {
        format!(
            "Tool '{tool}' (tier {tier}) requires approval.\nArguments: {truncated_args}\nReply 'approve:{id}' to allow or 'deny:{id}' to deny.",
            tool = self.tool,
            tier = self.tier,
            id = self.approval_id,
        )
    }
}

/// The acknowledgement text sent back once an approval reaches a terminal
/// state via user response (spec §6).
#[must_use]
pub fn acknowledgement_text(id: &ApprovalId, approved: bool) -> String {
    if approved {
        format!("Approval {id}: approved.")
    } else {
        format!("Approval {id}: denied.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_required_substrings() {
        let req = ApprovalRequest::new(
            "exec",
            Tier::HighRisk,
            serde_json::json!({"cmd": "echo hello"}),
            "owner",
            "cli",
            "room",
            TraceId::new(),
            TaskId::new(),
            Utc::now(),
        );
        let prompt = req.prompt_text("echo hello");
        assert!(prompt.contains("requires approval"));
        assert!(prompt.contains(&format!("approve:{}", req.approval_id)));
        assert!(prompt.contains(&format!("deny:{}", req.approval_id)));
    }

    #[test]
    fn acknowledgement_matches_exact_format() {
        let id = ApprovalId::generate();
        assert_eq!(
            acknowledgement_text(&id, true),
            format!("Approval {id}: approved.")
        );
        assert_eq!(
            acknowledgement_text(&id, false),
            format!("Approval {id}: denied.")
        );
    }
}
