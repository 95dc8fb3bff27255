//! Integration tests for the merge + restrict pipeline as `loader::load`
//! drives it: merge workspace over baseline, then enforce restrictions.

use super::{deep_merge, enforce_restrictions};

#[test]
fn workspace_cannot_raise_tier_above_baseline() {
    let baseline: toml::Value = toml::from_str(
        r#"[policy]
max_auto_tier = 1
external_max_tier = 0
"#,
    )
    .unwrap();
    let workspace: toml::Value = toml::from_str(
        r#"[policy]
max_auto_tier = 2
"#,
    )
    .unwrap();

    let mut merged = baseline.clone();
    deep_merge(&mut merged, &workspace);
    enforce_restrictions(&mut merged, &baseline, &workspace);

    assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(1));
    assert_eq!(merged["policy"]["external_max_tier"].as_integer(), Some(0));
}

#[test]
fn workspace_can_lower_tier_below_baseline() {
    let baseline: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 2\n").unwrap();
    let workspace: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 0\n").unwrap();

    let mut merged = baseline.clone();
    deep_merge(&mut merged, &workspace);
    enforce_restrictions(&mut merged, &baseline, &workspace);

    assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(0));
}

#[test]
fn workspace_cannot_drop_a_denied_sender() {
    let baseline: toml::Value = toml::from_str(
        r#"[policy]
deny_senders = ["spammer"]
"#,
    )
    .unwrap();
    let workspace: toml::Value = toml::from_str("[policy]\ndeny_senders = []\n").unwrap();

    let mut merged = baseline.clone();
    deep_merge(&mut merged, &workspace);
    enforce_restrictions(&mut merged, &baseline, &workspace);

    let arr = merged["policy"]["deny_senders"].as_array().unwrap();
    assert!(arr.iter().any(|v| v.as_str() == Some("spammer")));
}

#[test]
fn workspace_cannot_widen_nonempty_allow_list() {
    let baseline: toml::Value = toml::from_str(
        r#"[policy]
allowed_senders = ["owner"]
"#,
    )
    .unwrap();
    let workspace: toml::Value = toml::from_str(
        r#"[policy]
allowed_senders = ["owner", "new-guy"]
"#,
    )
    .unwrap();

    let mut merged = baseline.clone();
    deep_merge(&mut merged, &workspace);
    enforce_restrictions(&mut merged, &baseline, &workspace);

    let arr = merged["policy"]["allowed_senders"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
}
