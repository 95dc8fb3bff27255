//! Translates a resolved [`kafclaw_config::Config`] into the domain types
//! the runtime, policy, context, and telemetry crates are actually built
//! with. `kafclaw-config` itself has no dependency on any of those crates,
//! so this bridge — not `kafclaw-config` — owns every conversion.

use std::path::Path;

use kafclaw_config::Config;
use kafclaw_context::ContextBudget;
use kafclaw_core::Tier;
use kafclaw_policy::PolicyLimits;
use kafclaw_runtime::LoopConfig;
use kafclaw_telemetry::{LogConfig, LogFormat};

/// Build a [`LogConfig`] from the resolved config's `[logging]` section.
#[must_use]
pub(crate) fn to_log_config(config: &Config) -> LogConfig {
    let format = match config.logging.format.as_str() {
        "compact" => LogFormat::Compact,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Pretty,
    };
    LogConfig::new(config.logging.level.clone()).with_format(format)
}

/// Build [`PolicyLimits`] from the resolved config's `[policy]` section.
#[must_use]
pub(crate) fn to_policy_limits(config: &Config) -> PolicyLimits {
    PolicyLimits {
        max_auto_tier: tier_from_u8(config.policy.max_auto_tier),
        external_max_tier: tier_from_u8(config.policy.external_max_tier),
        deny_senders: config.policy.deny_senders.iter().cloned().collect(),
        allowed_senders: config.policy.allowed_senders.iter().cloned().collect(),
    }
}

fn tier_from_u8(value: u8) -> Tier {
    match value {
        0 => Tier::Read,
        1 => Tier::Write,
        _ => Tier::HighRisk,
    }
}

/// Build a [`LoopConfig`] from the resolved config's `[model]`, `[runtime]`,
/// and `[context]` sections, plus the identity/workspace/model values
/// resolved separately by the caller (command-line overrides take
/// priority over the config file for these three).
#[must_use]
pub(crate) fn to_loop_config(
    config: &Config,
    agent_name: impl Into<String>,
    workspace_root: &Path,
    model: impl Into<String>,
) -> LoopConfig {
    let mut loop_config = LoopConfig::new(agent_name, workspace_root, model);
    loop_config.max_iterations = config.runtime.max_iterations;
    loop_config.approval_timeout = std::time::Duration::from_secs(config.runtime.approval_timeout_seconds);
    loop_config.daily_token_limit = config.runtime.daily_token_limit;
    loop_config.trace_publish_timeout = std::time::Duration::from_secs(config.runtime.trace_publish_timeout_seconds);
    loop_config.policy_limits = to_policy_limits(config);
    loop_config.context_budget = ContextBudget::new(config.context.total_budget, config.context.section_cap);
    loop_config.rag_score_threshold = config.context.rag_score_threshold;
    loop_config.rag_top_k = config.context.rag_top_k;
    loop_config.max_rag_top_k = config.context.max_rag_top_k;
    loop_config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_logging_format() {
        let mut cfg = Config::default();
        cfg.logging.format = "json".to_string();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Json);
    }

    #[test]
    fn translates_policy_tiers() {
        let mut cfg = Config::default();
        cfg.policy.max_auto_tier = 2;
        let limits = to_policy_limits(&cfg);
        assert_eq!(limits.max_auto_tier, Tier::HighRisk);
    }

    #[test]
    fn loop_config_carries_runtime_knobs() {
        let mut cfg = Config::default();
        cfg.runtime.max_iterations = 5;
        let loop_config = to_loop_config(&cfg, "kafclaw", Path::new("/tmp/ws"), "gpt-test");
        assert_eq!(loop_config.max_iterations, 5);
    }
}
