//! Individual tighten-only enforcement rules, applied field-by-field
//! after the workspace layer has merged in.

use tracing::warn;

use super::path::{get_nested, set_nested};

/// Clamp an integer field so the workspace cannot raise it above the
/// pre-workspace baseline (used for `policy.max_auto_tier` and
/// `policy.external_max_tier`: raising either loosens the Policy
/// Engine).
pub(super) fn clamp_max_int(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
    field_name: &str,
) {
    let baseline_val = get_nested(baseline, path).and_then(toml::Value::as_integer);
    let ws_val = get_nested(workspace, path).and_then(toml::Value::as_integer);

    if let (Some(base_v), Some(ws_v)) = (baseline_val, ws_val) {
        if ws_v > base_v {
            warn!("workspace config tried to raise {field_name} from {base_v} to {ws_v}; clamping to {base_v}");
            set_nested(merged, path, toml::Value::Integer(base_v));
        }
    }
}

/// Union the workspace array with the baseline array: the workspace may
/// only add entries, never remove them (used for `policy.deny_senders`:
/// removing a denied sender loosens the policy).
pub(super) fn union_string_arrays(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    path: &[&str],
    field_name: &str,
) {
    let Some(baseline_items) = get_nested(baseline, path).and_then(|v| v.as_array().cloned()) else {
        return;
    };

    let merged_arr = get_nested(merged, path).and_then(|v| v.as_array().cloned()).unwrap_or_default();
    let mut result = merged_arr;
    for item in &baseline_items {
        if !result.contains(item) {
            warn!("workspace config removed an entry from {field_name}; restoring it (can only add, not remove)");
            result.push(item.clone());
        }
    }

    set_nested(merged, path, toml::Value::Array(result));
}

/// Enforce that a non-empty allow-list can only shrink, never grow
/// (used for `policy.allowed_senders`: a non-empty list is already a
/// restriction, so adding entries widens who may act — a loosening —
/// while removing entries narrows it further). When the baseline
/// allow-list is empty ("allow everyone"), the workspace may freely
/// populate it: doing so only ever narrows, never widens, an unrestricted
/// baseline.
pub(super) fn enforce_allow_list_subset(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    path: &[&str],
    field_name: &str,
) {
    let baseline_items = get_nested(baseline, path).and_then(|v| v.as_array().cloned()).unwrap_or_default();
    if baseline_items.is_empty() {
        return;
    }

    let Some(merged_items) = get_nested(merged, path).and_then(|v| v.as_array().cloned()) else {
        return;
    };

    let filtered: Vec<toml::Value> = merged_items.into_iter().filter(|item| baseline_items.contains(item)).collect();
    let dropped = filtered.len()
        != get_nested(merged, path).and_then(|v| v.as_array().map(Vec::len)).unwrap_or(filtered.len());
    if dropped {
        warn!("workspace config tried to widen {field_name} beyond baseline; narrowing to the intersection");
    }
    set_nested(merged, path, toml::Value::Array(filtered));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_blocks_increase() {
        let baseline: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 1").unwrap();
        let workspace: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 2").unwrap();
        let mut merged = workspace.clone();
        clamp_max_int(&mut merged, &baseline, &workspace, &["policy", "max_auto_tier"], "policy.max_auto_tier");
        assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(1));
    }

    #[test]
    fn clamp_allows_decrease() {
        let baseline: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 2").unwrap();
        let workspace: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 0").unwrap();
        let mut merged = workspace.clone();
        clamp_max_int(&mut merged, &baseline, &workspace, &["policy", "max_auto_tier"], "policy.max_auto_tier");
        assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(0));
    }

    #[test]
    fn union_restores_removed_deny_entry() {
        let baseline: toml::Value = toml::from_str(r#"[policy]
deny_senders = ["bad-actor"]"#)
            .unwrap();
        let mut merged: toml::Value = toml::from_str("[policy]\ndeny_senders = []").unwrap();
        union_string_arrays(&mut merged, &baseline, &["policy", "deny_senders"], "policy.deny_senders");
        let arr = merged["policy"]["deny_senders"].as_array().unwrap();
        assert!(arr.contains(&toml::Value::String("bad-actor".to_string())));
    }

    #[test]
    fn allow_list_cannot_widen_nonempty_baseline() {
        let baseline: toml::Value = toml::from_str(r#"[policy]
allowed_senders = ["owner"]"#)
            .unwrap();
        let mut merged: toml::Value = toml::from_str(r#"[policy]
allowed_senders = ["owner", "stranger"]"#)
            .unwrap();
        enforce_allow_list_subset(&mut merged, &baseline, &["policy", "allowed_senders"], "policy.allowed_senders");
        let arr = merged["policy"]["allowed_senders"].as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0].as_str(), Some("owner"));
    }

    #[test]
    fn allow_list_may_be_freely_introduced_from_empty_baseline() {
        let baseline: toml::Value = toml::from_str("[policy]\nallowed_senders = []").unwrap();
        let mut merged: toml::Value = toml::from_str(r#"[policy]
allowed_senders = ["owner"]"#)
            .unwrap();
        enforce_allow_list_subset(&mut merged, &baseline, &["policy", "allowed_senders"], "policy.allowed_senders");
        let arr = merged["policy"]["allowed_senders"].as_array().unwrap();
        assert_eq!(arr.len(), 1);
    }
}
