//! Configuration types for the KafClaw agent core.
//!
//! All types here are self-contained with no dependency on any other
//! internal `kafclaw-*` crate (SPEC_FULL §10.3, grounded on the teacher's
//! `astrid-config::types` "no dependencies on other internal astrid
//! crates" design rule). Bridges to domain types (`kafclaw_policy::PolicyLimits`,
//! `kafclaw_runtime::LoopConfig`, …) live in the crates that own those
//! domain types, converting at the boundary.
//!
//! Every section implements [`Default`] with the spec's documented
//! defaults, so a bare `[section]` header (or a missing one entirely)
//! produces a working configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the KafClaw agent core.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// LLM completion defaults (spec §4.6 step 7).
    pub model: ModelSection,
    /// Policy Engine tier limits and sender lists (spec §4.3, C4).
    pub policy: PolicySection,
    /// Agent Loop knobs (spec §4.6, C7).
    pub runtime: RuntimeSection,
    /// Context Builder byte-budget and RAG discipline (spec §4.5, C6).
    pub context: ContextSection,
    /// Memory retention and observation/reflection thresholds (spec §3, C9).
    pub memory: MemorySection,
    /// Scheduler tick and per-category concurrency (spec §4.10, C11).
    pub scheduler: SchedulerSection,
    /// Delivery Worker polling and retry (spec §4.11, C12).
    pub delivery: DeliverySection,
    /// Sub-agent Supervisor governance (spec §4.7, C8).
    pub subagents: SubagentSection,
    /// Logging level and format (SPEC_FULL §10.1).
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// ModelSection
// ---------------------------------------------------------------------------

/// LLM transport defaults (spec §4.6 step 7: "model, maxTokens=4096,
/// temperature=0.7").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelSection {
    /// Model identifier passed to every completion call.
    pub model: String,
    /// Maximum tokens to request per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self { model: "default-model".to_string(), max_tokens: 4096, temperature: 0.7 }
    }
}

// ---------------------------------------------------------------------------
// PolicySection
// ---------------------------------------------------------------------------

/// Policy Engine tier limits and sender lists (spec §4.3).
///
/// `max_auto_tier` and `external_max_tier` are the two fields the
/// workspace layer may only *tighten* (SPEC_FULL §10.3): a workspace
/// config cannot raise either above the user/system/defaults value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicySection {
    /// Highest tier an `internal` message may invoke without requiring
    /// approval (spec §4.3 rule 2). `0` = read, `1` = write, `2` = high-risk.
    pub max_auto_tier: u8,
    /// Highest tier an `external` message may invoke at all (spec §4.3
    /// rule 1).
    pub external_max_tier: u8,
    /// Senders always denied, regardless of tier (spec §4.3 rule 3).
    /// Workspace may only add entries, never remove them.
    pub deny_senders: Vec<String>,
    /// If non-empty, only senders in this set may invoke tools at all
    /// (spec §4.3 rule 4). Workspace may only narrow this list, never
    /// widen it.
    pub allowed_senders: Vec<String>,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self { max_auto_tier: 1, external_max_tier: 0, deny_senders: Vec::new(), allowed_senders: Vec::new() }
    }
}

// ---------------------------------------------------------------------------
// RuntimeSection
// ---------------------------------------------------------------------------

/// Agent Loop knobs (spec §4.6, §6 settings keys `approval_timeout_seconds`
/// and `daily_token_limit`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeSection {
    /// Bound on think/act iterations per turn (spec §4.6 step 7).
    pub max_iterations: u32,
    /// How long to wait for a human approval reply before timing out
    /// (settings key `approval_timeout_seconds`).
    pub approval_timeout_seconds: u64,
    /// Daily per-agent token budget, UTC day boundaries (settings key
    /// `daily_token_limit`).
    pub daily_token_limit: u64,
    /// Timeout for fire-and-forget audit shipping at turn end (spec §4.6
    /// step 9).
    pub trace_publish_timeout_seconds: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            approval_timeout_seconds: 60,
            daily_token_limit: 200_000,
            trace_publish_timeout_seconds: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// ContextSection
// ---------------------------------------------------------------------------

/// Context Builder byte-budget and RAG discipline (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContextSection {
    /// Total character budget for the assembled system message.
    pub total_budget: usize,
    /// Per-section cap; floored at 1200 by [`crate::validate::validate`].
    pub section_cap: usize,
    /// Minimum RAG recall score to keep a result, clamped to `[0, 1]`.
    pub rag_score_threshold: f64,
    /// Default RAG top-K.
    pub rag_top_k: usize,
    /// Upper clamp on RAG top-K (`maxMemoryLaneTopK`).
    pub max_rag_top_k: usize,
}

impl Default for ContextSection {
    fn default() -> Self {
        Self { total_budget: 16_000, section_cap: 1200, rag_score_threshold: 0.3, rag_top_k: 5, max_rag_top_k: 10 }
    }
}

// ---------------------------------------------------------------------------
// MemorySection
// ---------------------------------------------------------------------------

/// Memory retention and observation/reflection thresholds (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemorySection {
    /// Hard cap on stored chunks before oldest-first pruning of
    /// non-permanent chunks kicks in.
    pub max_chunks: usize,
    /// Unobserved queued messages threshold that triggers the Observer.
    pub observation_threshold: usize,
    /// Total observation count that triggers the Reflector.
    pub reflection_max: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self { max_chunks: 50_000, observation_threshold: 50, reflection_max: 200 }
    }
}

// ---------------------------------------------------------------------------
// SchedulerSection
// ---------------------------------------------------------------------------

/// Scheduler tick interval and per-category concurrency (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerSection {
    /// Seconds between ticks.
    pub tick_interval_secs: u64,
    /// Concurrent `llm`-category jobs.
    pub llm_concurrency: usize,
    /// Concurrent `shell`-category jobs.
    pub shell_concurrency: usize,
    /// Concurrent `default`-category jobs.
    pub default_concurrency: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { tick_interval_secs: 60, llm_concurrency: 3, shell_concurrency: 1, default_concurrency: 5 }
    }
}

// ---------------------------------------------------------------------------
// DeliverySection
// ---------------------------------------------------------------------------

/// Delivery Worker polling and retry (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeliverySection {
    /// Seconds between poll passes over pending deliveries.
    pub poll_interval_secs: u64,
    /// Delivery attempts before a task is marked `failed`.
    pub max_retry: u32,
}

impl Default for DeliverySection {
    fn default() -> Self {
        Self { poll_interval_secs: 5, max_retry: 5 }
    }
}

// ---------------------------------------------------------------------------
// SubagentSection
// ---------------------------------------------------------------------------

/// Sub-agent Supervisor governance (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubagentSection {
    /// Maximum nesting depth per session.
    pub max_spawn_depth: u32,
    /// Maximum concurrent child runs.
    pub max_children: u32,
    /// Deferred-announcement retry interval, in seconds.
    pub announce_retry_interval_secs: u64,
}

impl Default for SubagentSection {
    fn default() -> Self {
        Self { max_spawn_depth: 3, max_children: 5, announce_retry_interval_secs: 30 }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging level and format (SPEC_FULL §10.1). Kept as plain strings here
/// so this crate has no dependency on `kafclaw-telemetry`; the CLI parses
/// `format` into `kafclaw_telemetry::LogFormat` at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level filter (e.g. `"info"`, `"debug"`).
    pub level: String,
    /// Log format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.model.max_tokens, 4096);
        assert!((cfg.model.temperature - 0.7).abs() < f64::EPSILON);
        assert_eq!(cfg.policy.max_auto_tier, 1);
        assert_eq!(cfg.policy.external_max_tier, 0);
        assert_eq!(cfg.runtime.max_iterations, 20);
        assert_eq!(cfg.runtime.approval_timeout_seconds, 60);
        assert_eq!(cfg.runtime.daily_token_limit, 200_000);
        assert_eq!(cfg.context.total_budget, 16_000);
        assert_eq!(cfg.memory.max_chunks, 50_000);
        assert_eq!(cfg.scheduler.llm_concurrency, 3);
        assert_eq!(cfg.scheduler.shell_concurrency, 1);
        assert_eq!(cfg.delivery.max_retry, 5);
    }

    #[test]
    fn bare_toml_section_uses_defaults() {
        let cfg: Config = toml::from_str("[policy]\nmax_auto_tier = 2\n").unwrap();
        assert_eq!(cfg.policy.max_auto_tier, 2);
        assert_eq!(cfg.policy.external_max_tier, 0);
        assert_eq!(cfg.runtime.max_iterations, 20);
    }
}
