//! Environment variable fallback resolution (`KAFCLAW_*`).
//!
//! Applied after the workspace layer has merged and been restricted, and
//! only to leaf paths still unset by every file layer — an environment
//! variable never overrides a value a config file set (spec §6: "all
//! optional; malformed values fall back to defaults").

use std::collections::HashMap;

use tracing::warn;

use crate::merge::path::{get_nested, set_nested};

const PREFIX: &str = "KAFCLAW_";

/// One fallback mapping: an env var name suffix (after `KAFCLAW_`), the
/// dotted config path it fills, and how to parse the raw string.
struct EnvMapping {
    suffix: &'static str,
    path: &'static [&'static str],
    kind: ValueKind,
}

enum ValueKind {
    String,
    Integer,
    Float,
}

const MAPPINGS: &[EnvMapping] = &[
    EnvMapping { suffix: "MODEL", path: &["model", "model"], kind: ValueKind::String },
    EnvMapping { suffix: "MODEL_MAX_TOKENS", path: &["model", "max_tokens"], kind: ValueKind::Integer },
    EnvMapping { suffix: "MODEL_TEMPERATURE", path: &["model", "temperature"], kind: ValueKind::Float },
    EnvMapping { suffix: "POLICY_MAX_AUTO_TIER", path: &["policy", "max_auto_tier"], kind: ValueKind::Integer },
    EnvMapping {
        suffix: "POLICY_EXTERNAL_MAX_TIER",
        path: &["policy", "external_max_tier"],
        kind: ValueKind::Integer,
    },
    EnvMapping { suffix: "RUNTIME_MAX_ITERATIONS", path: &["runtime", "max_iterations"], kind: ValueKind::Integer },
    EnvMapping {
        suffix: "RUNTIME_APPROVAL_TIMEOUT_SECONDS",
        path: &["runtime", "approval_timeout_seconds"],
        kind: ValueKind::Integer,
    },
    EnvMapping {
        suffix: "RUNTIME_DAILY_TOKEN_LIMIT",
        path: &["runtime", "daily_token_limit"],
        kind: ValueKind::Integer,
    },
    EnvMapping { suffix: "LOGGING_LEVEL", path: &["logging", "level"], kind: ValueKind::String },
    EnvMapping { suffix: "LOGGING_FORMAT", path: &["logging", "format"], kind: ValueKind::String },
    EnvMapping {
        suffix: "SCHEDULER_TICK_INTERVAL_SECS",
        path: &["scheduler", "tick_interval_secs"],
        kind: ValueKind::Integer,
    },
    EnvMapping { suffix: "DELIVERY_MAX_RETRY", path: &["delivery", "max_retry"], kind: ValueKind::Integer },
];

/// Collect every `KAFCLAW_*` environment variable present in this process.
pub(crate) fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().filter(|(k, _)| k.starts_with(PREFIX)).collect()
}

/// Apply env var fallbacks for every mapped path still unset in `merged`.
/// Returns the count of fields filled in. A malformed value (fails to
/// parse as the field's type) is logged and skipped, never causes a hard
/// error.
pub(crate) fn apply_env_fallbacks(merged: &mut toml::Value, env_vars: &HashMap<String, String>) -> usize {
    let mut applied = 0;

    for mapping in MAPPINGS {
        let var_name = format!("{PREFIX}{}", mapping.suffix);
        let Some(raw) = env_vars.get(&var_name) else { continue };

        if get_nested(merged, mapping.path).is_some() {
            // Already set by a file layer; env is fallback-only.
            continue;
        }

        let parsed = match mapping.kind {
            ValueKind::String => Some(toml::Value::String(raw.clone())),
            ValueKind::Integer => {
                raw.parse::<i64>().ok().map(toml::Value::Integer).or_else(|| {
                    warn!(var = %var_name, value = %raw, "malformed integer env override, falling back to default");
                    None
                })
            },
            ValueKind::Float => raw.parse::<f64>().ok().map(toml::Value::Float).or_else(|| {
                warn!(var = %var_name, value = %raw, "malformed float env override, falling back to default");
                None
            }),
        };

        if let Some(value) = parsed {
            set_nested(merged, mapping.path, value);
            applied += 1;
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_unset_integer_field() {
        let mut merged: toml::Value = toml::from_str("[policy]\n").unwrap();
        let mut env = HashMap::new();
        env.insert("KAFCLAW_POLICY_MAX_AUTO_TIER".to_string(), "2".to_string());

        let count = apply_env_fallbacks(&mut merged, &env);
        assert_eq!(count, 1);
        assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(2));
    }

    #[test]
    fn does_not_override_already_set_field() {
        let mut merged: toml::Value = toml::from_str("[policy]\nmax_auto_tier = 1\n").unwrap();
        let mut env = HashMap::new();
        env.insert("KAFCLAW_POLICY_MAX_AUTO_TIER".to_string(), "2".to_string());

        let count = apply_env_fallbacks(&mut merged, &env);
        assert_eq!(count, 0);
        assert_eq!(merged["policy"]["max_auto_tier"].as_integer(), Some(1));
    }

    #[test]
    fn malformed_value_is_skipped_not_fatal() {
        let mut merged: toml::Value = toml::from_str("[policy]\n").unwrap();
        let mut env = HashMap::new();
        env.insert("KAFCLAW_POLICY_MAX_AUTO_TIER".to_string(), "not-a-number".to_string());

        let count = apply_env_fallbacks(&mut merged, &env);
        assert_eq!(count, 0);
        assert!(get_nested(&merged, &["policy", "max_auto_tier"]).is_none());
    }
}
