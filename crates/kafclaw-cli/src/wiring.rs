//! Process wiring: construct every collaborator the Agent Loop, Scheduler,
//! and Delivery Worker are driven over, sharing one storage backend.
//! Follows `kafclaw-runtime`'s own `agent::tests::make_loop` helper, the
//! one place in the workspace that already assembles the full
//! collaborator graph — generalized here from an in-memory test backend
//! to whichever backend the resolved config names.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kafclaw_approval::ApprovalManager;
use kafclaw_audit::{AuditChain, SecurityAuditRecorder};
use kafclaw_bus::{InboundBus, OutboundBus};
use kafclaw_config::Config;
use kafclaw_context::{ContextBudget, ContextBuilder};
use kafclaw_core::{Clock, SystemClock};
use kafclaw_expertise::ExpertiseTracker;
use kafclaw_llm::{LlmProvider, OpenAiCompatProvider};
use kafclaw_memory::{MemoryStore, ObservationQueue, ObservationStore, Reflector};
use kafclaw_runtime::{
    AgentLoop, AutoIndexer, LlmTextCompressor, LoopConfig, PolicyDecisionStore, SessionStore, SubagentSupervisor,
    TaskDeliverySink, TaskStore, TimelineStore,
};
use kafclaw_storage::{Database, KvStore, MemoryKvStore, SurrealKvStore};
use kafclaw_tools::ToolRegistry;
use tokio_util::sync::CancellationToken;

use crate::cli::ProviderArgs;
use crate::config_bridge;

/// Everything [`run`](crate::commands::run::run) needs to drive the
/// process: the assembled Agent Loop plus the buses and background
/// collaborators that live alongside it.
pub(crate) struct Wiring {
    pub(crate) agent_loop: Arc<AgentLoop>,
    pub(crate) inbound: Arc<InboundBus>,
    pub(crate) outbound: Arc<OutboundBus>,
    pub(crate) scheduler: Arc<kafclaw_scheduler::Scheduler>,
    pub(crate) delivery_sink: Arc<TaskDeliverySink>,
    pub(crate) delivery_poll_interval: std::time::Duration,
    pub(crate) delivery_max_retry: u32,
    pub(crate) cancel: CancellationToken,
}

/// Build the storage backend named by `workspace_root`: an embedded
/// SurrealKV store under `{workspace_root}/.kafclaw/data`, or a pure
/// in-memory store when `in_memory` is set (used for quick trials and
/// tests).
///
/// # Errors
///
/// Returns an error if the embedded database cannot be opened.
pub(crate) async fn build_backend(workspace_root: &Path, in_memory: bool) -> anyhow::Result<Arc<dyn KvStore>> {
    if in_memory {
        return Ok(Arc::new(MemoryKvStore::new()));
    }
    let data_dir = workspace_root.join(".kafclaw").join("data");
    std::fs::create_dir_all(&data_dir)?;
    let path = data_dir.to_string_lossy().into_owned();
    let db = Database::connect_embedded(&path).await?;
    Ok(Arc::new(SurrealKvStore::new(Arc::new(db))))
}

/// Build the LLM provider named by `provider_args`. With neither a
/// base URL nor an API key given, falls back to a local `OpenAI`-compatible
/// endpoint (LM Studio's default), which needs no key.
pub(crate) fn build_llm_provider(provider_args: &ProviderArgs) -> Arc<dyn LlmProvider> {
    let provider: OpenAiCompatProvider = match (&provider_args.base_url, &provider_args.api_key) {
        (Some(base_url), api_key) => OpenAiCompatProvider::custom(base_url.clone(), api_key.clone()),
        (None, Some(api_key)) => OpenAiCompatProvider::openai(api_key.clone()),
        (None, None) => OpenAiCompatProvider::custom("http://localhost:1234/v1/chat/completions", None),
    };
    Arc::new(provider)
}

/// Assemble every collaborator over a freshly built `backend`.
#[must_use]
pub(crate) fn assemble(
    config: &Config,
    workspace_root: PathBuf,
    agent_name: &str,
    model: &str,
    llm: Arc<dyn LlmProvider>,
    backend: Arc<dyn KvStore>,
) -> Wiring {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();

    let sessions = Arc::new(SessionStore::new(backend.clone()));
    let outbound = Arc::new(OutboundBus::new());
    let inbound = Arc::new(InboundBus::new());
    let tools = Arc::new(ToolRegistry::with_defaults());
    let memory = Arc::new(MemoryStore::new(backend.clone()));
    let tasks = Arc::new(TaskStore::new(backend.clone()));

    let loop_config = config_bridge::to_loop_config(config, agent_name, &workspace_root, model);
    let state_dir = workspace_root.join(".kafclaw");
    let _ = std::fs::create_dir_all(&state_dir);

    let compressor = Arc::new(LlmTextCompressor::new(llm.clone(), model.to_string()));

    let agent_loop = Arc::new(AgentLoop::new(
        loop_config,
        clock,
        tasks.clone(),
        sessions.clone(),
        Arc::new(TimelineStore::new(backend.clone())),
        Arc::new(PolicyDecisionStore::new(backend.clone())),
        Arc::new(ApprovalManager::new()),
        Arc::new(ContextBuilder::new(ContextBudget::new(config.context.total_budget, config.context.section_cap))),
        llm,
        tools,
        memory.clone(),
        Arc::new(ObservationQueue::with_threshold(backend.clone(), config.memory.observation_threshold)),
        Arc::new(ObservationStore::new(backend.clone())),
        Arc::new(Reflector::with_max_observations(config.memory.reflection_max)),
        compressor,
        Arc::new(ExpertiseTracker::new(backend.clone())),
        Arc::new(AutoIndexer::new(memory)),
        Arc::new(SubagentSupervisor::new(backend, sessions, outbound.clone()).with_limits(
            config.subagents.max_spawn_depth,
            config.subagents.max_children as usize,
        )),
        outbound.clone(),
        Arc::new(SecurityAuditRecorder::new(&state_dir)),
        Arc::new(AuditChain::new(state_dir.join("audit.jsonl"))),
        cancel.clone(),
    ));

    let lock_path = state_dir.join("scheduler.lock");
    let scheduler = Arc::new(kafclaw_scheduler::Scheduler::with_limits(
        inbound.clone(),
        lock_path,
        config.scheduler.llm_concurrency,
        config.scheduler.shell_concurrency,
        config.scheduler.default_concurrency,
        std::time::Duration::from_secs(config.scheduler.tick_interval_secs),
    ));

    let delivery_sink = Arc::new(TaskDeliverySink::new(tasks, outbound.clone()));

    Wiring {
        agent_loop,
        inbound,
        outbound,
        scheduler,
        delivery_sink,
        delivery_poll_interval: std::time::Duration::from_secs(config.delivery.poll_interval_secs),
        delivery_max_retry: config.delivery.max_retry,
        cancel,
    }
}
