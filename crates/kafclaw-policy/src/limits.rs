//! Typed settings view the policy engine reads tier limits and sender
//! lists from (spec §4.3: "state ... is read from a typed settings view").

use std::collections::HashSet;

use kafclaw_core::Tier;

/// Tier and sender limits the policy engine evaluates against.
///
/// Constructed fresh from settings on every evaluation by
/// [`crate::PolicyEngine::from_settings`] (SPEC_FULL §11), so an operator
/// changing a limit takes effect on the next turn without a restart.
#[derive(Debug, Clone)]
pub struct PolicyLimits {
    /// Highest tier an `internal` message may invoke without requiring
    /// approval.
    pub max_auto_tier: Tier,
    /// Highest tier an `external` message may invoke at all.
    pub external_max_tier: Tier,
    /// Senders always denied, regardless of tier.
    pub deny_senders: HashSet<String>,
    /// If non-empty, only senders in this set may invoke tools at all.
    pub allowed_senders: HashSet<String>,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self {
            max_auto_tier: Tier::Write,
            external_max_tier: Tier::Read,
            deny_senders: HashSet::new(),
            allowed_senders: HashSet::new(),
        }
    }
}

impl PolicyLimits {
    /// Build limits with explicit tier caps and empty sender lists.
    #[must_use]
    pub fn with_tiers(max_auto_tier: Tier, external_max_tier: Tier) -> Self {
        Self {
            max_auto_tier,
            external_max_tier,
            ..Self::default()
        }
    }

    /// Add a denied sender, returning `self` for chaining.
    #[must_use]
    pub fn deny_sender(mut self, sender: impl Into<String>) -> Self {
        self.deny_senders.insert(sender.into());
        self
    }

    /// Add an allow-listed sender, returning `self` for chaining.
    #[must_use]
    pub fn allow_sender(mut self, sender: impl Into<String>) -> Self {
        self.allowed_senders.insert(sender.into());
        self
    }
}
