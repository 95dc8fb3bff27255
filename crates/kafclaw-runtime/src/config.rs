//! Agent Loop configuration (spec §4.6, §6 settings keys).
//!
//! `kafclaw-config` owns layered settings loading (env, files, defaults)
//! for the process as a whole; this crate does not depend on it
//! directly. The CLI wiring layer reads a resolved settings value and
//! translates it into one of these plain, already-defaulted structs
//! before calling [`crate::AgentLoop::new`], keeping the runtime crate
//! free of config-source concerns.

use std::path::PathBuf;
use std::time::Duration;

use kafclaw_context::ContextBudget;
use kafclaw_policy::PolicyLimits;

/// Default bound on think/act iterations per turn (spec §4.6 step 7).
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Default approval wait timeout (spec §4.4, settings key
/// `approval_timeout_seconds`).
pub const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 60;

/// Default daily per-agent token budget (settings key `daily_token_limit`).
pub const DEFAULT_DAILY_TOKEN_LIMIT: u64 = 200_000;

/// Default fire-and-forget timeout for trace publication (spec §4.6 step 9).
pub const DEFAULT_TRACE_PUBLISH_TIMEOUT_SECS: u64 = 10;

/// Default RAG recall score threshold (spec §4.5).
pub const DEFAULT_RAG_SCORE_THRESHOLD: f64 = 0.3;

/// Default RAG top-K (spec §4.5).
pub const DEFAULT_RAG_TOP_K: usize = 5;

/// Upper clamp on RAG top-K (spec §4.5's `maxMemoryLaneTopK`).
pub const DEFAULT_MAX_RAG_TOP_K: usize = 10;

/// Fixed configuration an [`crate::AgentLoop`] is built with.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Name the agent presents in the assembled identity section.
    pub agent_name: String,
    /// Root directory tools resolve relative paths against.
    pub workspace_root: PathBuf,
    /// LLM model identifier passed to every completion call.
    pub model: String,
    /// Bound on think/act iterations per turn.
    pub max_iterations: u32,
    /// How long to wait for a human approval reply before timing out.
    pub approval_timeout: Duration,
    /// Daily token budget per agent, UTC day boundaries.
    pub daily_token_limit: u64,
    /// Timeout for fire-and-forget audit shipping at turn end.
    pub trace_publish_timeout: Duration,
    /// Tool-tier policy ladder.
    pub policy_limits: PolicyLimits,
    /// System-message byte-budget discipline.
    pub context_budget: ContextBudget,
    /// Minimum RAG recall score to keep a result.
    pub rag_score_threshold: f64,
    /// Default RAG top-K.
    pub rag_top_k: usize,
    /// Upper clamp on RAG top-K.
    pub max_rag_top_k: usize,
}

impl LoopConfig {
    /// Build a config with the spec's documented defaults for everything
    /// but identity, workspace root, and model.
    #[must_use]
    pub fn new(
        agent_name: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            workspace_root: workspace_root.into(),
            model: model.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            approval_timeout: Duration::from_secs(DEFAULT_APPROVAL_TIMEOUT_SECS),
            daily_token_limit: DEFAULT_DAILY_TOKEN_LIMIT,
            trace_publish_timeout: Duration::from_secs(DEFAULT_TRACE_PUBLISH_TIMEOUT_SECS),
            policy_limits: PolicyLimits::default(),
            context_budget: ContextBudget::default(),
            rag_score_threshold: DEFAULT_RAG_SCORE_THRESHOLD,
            rag_top_k: DEFAULT_RAG_TOP_K,
            max_rag_top_k: DEFAULT_MAX_RAG_TOP_K,
        }
    }
}
