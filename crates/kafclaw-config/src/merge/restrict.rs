//! Entry point for tighten-only workspace enforcement.

use super::enforce::{clamp_max_int, enforce_allow_list_subset, union_string_arrays};

/// Enforce that the workspace layer can only *tighten* policy, never
/// loosen it (SPEC_FULL §10.3). Call after merging the workspace layer
/// but before deserialization.
///
/// `baseline` is the merged config *before* the workspace layer was
/// applied (defaults + system + user), so enforcement works even when no
/// user config file exists.
pub fn enforce_restrictions(merged: &mut toml::Value, baseline: &toml::Value, workspace_layer: &toml::Value) {
    clamp_max_int(merged, baseline, workspace_layer, &["policy", "max_auto_tier"], "policy.max_auto_tier");
    clamp_max_int(merged, baseline, workspace_layer, &["policy", "external_max_tier"], "policy.external_max_tier");
    union_string_arrays(merged, baseline, &["policy", "deny_senders"], "policy.deny_senders");
    enforce_allow_list_subset(merged, baseline, &["policy", "allowed_senders"], "policy.allowed_senders");
}
