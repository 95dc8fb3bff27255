//! The deterministic policy engine (spec §4.3, C4).
//!
//! Rules are evaluated top-down and the first match wins, mirroring the
//! teacher's `SecurityPolicy::check` ordering (`astrid-approval::policy`):
//! blocked conditions first, approval-requiring conditions next, allow as
//! the fallthrough. Every evaluation is pure — it only reads from the
//! [`PolicyLimits`] view passed in, never from process-global state.

use kafclaw_core::MessageType;

use crate::decision::{reasons, Decision, PolicyContext};
use crate::limits::PolicyLimits;

/// Evaluates tool calls against a fixed set of tier/sender rules.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    limits: PolicyLimits,
}

impl PolicyEngine {
    /// Build an engine from an already-resolved limits view.
    #[must_use]
    pub fn new(limits: PolicyLimits) -> Self {
        Self { limits }
    }

    /// Build an engine re-reading limits from settings on construction.
    ///
    /// Named to mirror the re-evaluation story in SPEC_FULL §11: callers
    /// are expected to call this again each turn (cheap — `PolicyLimits`
    /// is a small value type) rather than caching a `PolicyEngine` across
    /// turns, so a settings change takes effect on the very next turn.
    #[must_use]
    pub fn from_settings(limits: PolicyLimits) -> Self {
        Self::new(limits)
    }

    /// Evaluate one tool call.
    ///
    /// Rule order (spec §4.3):
    /// 1. `messageType = external` and `tier > ExternalMaxTier` → deny.
    /// 2. `tier > MaxAutoTier` and `messageType = internal` → requires approval.
    /// 3. `sender` in `DenySenders` → deny.
    /// 4. `AllowedSenders` non-empty and `sender` not in it → deny.
    /// 5. Otherwise → allow.
    #[must_use]
    pub fn evaluate(&self, ctx: &PolicyContext) -> Decision {
        if ctx.message_type == MessageType::External && ctx.tier > self.limits.external_max_tier {
            return Decision::deny(reasons::EXTERNAL_TIER_EXCEEDED).with_tier(ctx.tier);
        }

        if ctx.tier > self.limits.max_auto_tier && ctx.message_type == MessageType::Internal {
            return Decision::requires_approval(reasons::REQUIRES_APPROVAL).with_tier(ctx.tier);
        }

        if self.limits.deny_senders.contains(&ctx.sender) {
            return Decision::deny(reasons::SENDER_DENIED).with_tier(ctx.tier);
        }

        if !self.limits.allowed_senders.is_empty()
            && !self.limits.allowed_senders.contains(&ctx.sender)
        {
            return Decision::deny(reasons::SENDER_NOT_ALLOWED).with_tier(ctx.tier);
        }

        Decision::allow().with_tier(ctx.tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_core::{TaskId, Tier, TraceId};
    use serde_json::json;

    fn ctx(tier: Tier, message_type: MessageType, sender: &str) -> PolicyContext {
        PolicyContext {
            sender: sender.to_string(),
            channel: "whatsapp".to_string(),
            tool: "write_file".to_string(),
            tier,
            args: json!({}),
            trace_id: TraceId::new(),
            task_id: TaskId::new(),
            message_type,
        }
    }

    #[test]
    fn internal_write_allowed_external_write_denied() {
        let engine = PolicyEngine::new(PolicyLimits::with_tiers(Tier::HighRisk, Tier::Read));

        let internal = engine.evaluate(&ctx(Tier::Write, MessageType::Internal, "owner"));
        assert!(internal.allow);

        let external = engine.evaluate(&ctx(Tier::Write, MessageType::External, "stranger"));
        assert!(!external.allow);
        assert_eq!(external.reason, reasons::EXTERNAL_TIER_EXCEEDED);
    }

    #[test]
    fn internal_over_max_auto_tier_requires_approval() {
        let engine = PolicyEngine::new(PolicyLimits::with_tiers(Tier::Write, Tier::Read));
        let decision = engine.evaluate(&ctx(Tier::HighRisk, MessageType::Internal, "owner"));
        assert!(!decision.allow);
        assert!(decision.requires_approval);
        assert_eq!(decision.reason, reasons::REQUIRES_APPROVAL);
    }

    #[test]
    fn denied_sender_is_blocked_even_at_read_tier() {
        let limits = PolicyLimits::with_tiers(Tier::HighRisk, Tier::HighRisk).deny_sender("bad");
        let engine = PolicyEngine::new(limits);
        let decision = engine.evaluate(&ctx(Tier::Read, MessageType::Internal, "bad"));
        assert!(!decision.allow);
        assert_eq!(decision.reason, reasons::SENDER_DENIED);
    }

    #[test]
    fn allow_list_excludes_unlisted_senders() {
        let limits =
            PolicyLimits::with_tiers(Tier::HighRisk, Tier::HighRisk).allow_sender("owner");
        let engine = PolicyEngine::new(limits);

        let allowed = engine.evaluate(&ctx(Tier::Read, MessageType::Internal, "owner"));
        assert!(allowed.allow);

        let denied = engine.evaluate(&ctx(Tier::Read, MessageType::Internal, "someone_else"));
        assert!(!denied.allow);
        assert_eq!(denied.reason, reasons::SENDER_NOT_ALLOWED);
    }

    #[test]
    fn unset_message_type_defaults_external_and_is_conservative() {
        // MessageType::default() is External (spec §9 Open Question).
        let engine = PolicyEngine::new(PolicyLimits::with_tiers(Tier::HighRisk, Tier::Read));
        let decision = engine.evaluate(&ctx(Tier::Write, MessageType::default(), "anyone"));
        assert!(!decision.allow);
        assert_eq!(decision.reason, reasons::EXTERNAL_TIER_EXCEEDED);
    }

    #[test]
    fn read_tier_allowed_externally_by_default() {
        let engine = PolicyEngine::new(PolicyLimits::default());
        let decision = engine.evaluate(&ctx(Tier::Read, MessageType::External, "anyone"));
        assert!(decision.allow);
    }
}
