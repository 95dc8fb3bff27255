//! Policy inputs, outputs, and the persisted decision record (spec §3, §4.3).

use kafclaw_core::{MessageType, TaskId, Tier, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the policy engine needs to evaluate one tool call.
#[derive(Debug, Clone)]
pub struct PolicyContext {
    /// Sender of the inbound message driving this tool call.
    pub sender: String,
    /// Originating channel.
    pub channel: String,
    /// Tool being called.
    pub tool: String,
    /// Tier of that tool.
    pub tier: Tier,
    /// Arguments the tool was called with.
    pub args: Value,
    /// Trace this call belongs to.
    pub trace_id: TraceId,
    /// Task this call belongs to.
    pub task_id: TaskId,
    /// Trust class of the driving message.
    pub message_type: MessageType,
}

/// The well-known reason strings the policy engine produces. Kept as
/// `&'static str` constants (not an enum) because spec §4.3/§8 treats them
/// as stable strings persisted verbatim into `PolicyDecision.reason` and
/// matched against in tests and tool-role messages.
pub mod reasons {
    /// Rule 1: tier exceeds `ExternalMaxTier` for an external message.
    pub const EXTERNAL_TIER_EXCEEDED: &str = "external_tier_exceeded";
    /// Rule 2: tier exceeds `MaxAutoTier` for an internal message; gated on approval.
    pub const REQUIRES_APPROVAL: &str = "requires_approval";
    /// Rule 3: sender is explicitly denied.
    pub const SENDER_DENIED: &str = "sender_denied";
    /// Rule 4: allow-list is non-empty and sender is not on it.
    pub const SENDER_NOT_ALLOWED: &str = "sender_not_allowlisted";
    /// Rule 5 (default): nothing else applied.
    pub const ALLOWED: &str = "allowed";
}

/// The outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the call may proceed without further gating.
    pub allow: bool,
    /// Stable reason string (see [`reasons`]).
    pub reason: String,
    /// Whether the caller must route through the Approval Manager before
    /// executing. Implies `allow = false`.
    pub requires_approval: bool,
    /// Tier the decision was evaluated against.
    pub tier: Tier,
}

impl Decision {
    /// Build an unconditional allow.
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allow: true,
            reason: reasons::ALLOWED.to_string(),
            requires_approval: false,
            tier: Tier::Read,
        }
    }

    /// Build a deny with the given reason.
    #[must_use]
    pub fn deny(reason: &str) -> Self {
        Self {
            allow: false,
            reason: reason.to_string(),
            requires_approval: false,
            tier: Tier::Read,
        }
    }

    /// Build a deny that requires an approval gate.
    #[must_use]
    pub fn requires_approval(reason: &str) -> Self {
        Self {
            allow: false,
            reason: reason.to_string(),
            requires_approval: true,
            tier: Tier::Read,
        }
    }

    /// Attach the tier this decision was evaluated for.
    #[must_use]
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }
}

/// The persisted record of one policy evaluation (spec §3 `PolicyDecision`).
///
/// Written for every tool call, before any approval interaction, so the
/// spec §8 invariant ("a `PolicyDecision` row exists with the same
/// `(traceID, tool)` before any execution or approval prompt") always
/// holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// Trace this decision belongs to.
    pub trace_id: TraceId,
    /// Task this decision belongs to.
    pub task_id: TaskId,
    /// Tool evaluated.
    pub tool: String,
    /// Tier evaluated against.
    pub tier: Tier,
    /// Sender the call was attributed to.
    pub sender: String,
    /// Channel the call was attributed to.
    pub channel: String,
    /// Whether the call was allowed without gating.
    pub allowed: bool,
    /// Stable reason string.
    pub reason: String,
}

impl PolicyDecision {
    /// Build the persisted record from a context and its decision.
    #[must_use]
    pub fn from_context(ctx: &PolicyContext, decision: &Decision) -> Self {
        Self {
            trace_id: ctx.trace_id,
            task_id: ctx.task_id,
            tool: ctx.tool.clone(),
            tier: ctx.tier,
            sender: ctx.sender.clone(),
            channel: ctx.channel.clone(),
            allowed: decision.allow,
            reason: decision.reason.clone(),
        }
    }
}
