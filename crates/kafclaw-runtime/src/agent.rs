//! The Agent Loop (spec §4.6, C7): the fixed per-message sequence every
//! inbound message is driven through — idempotency check, approval-reply
//! interception, the attack-intent refusal gate, Day2Day command
//! interception, session load, daily quota enforcement, context assembly,
//! a bounded think/act loop against the LLM and tool registry, and
//! finalization (session/task persistence, memory indexing, observation
//! batching, fire-and-forget audit shipping).
//!
//! Every other crate in the workspace is a narrow collaborator this loop
//! drives in that fixed order; grounded on the teacher's
//! `astrid-runtime::runtime::AgentRuntime::process_message`, which plays
//! the identical orchestrating role over an equivalent cast of
//! policy/approval/context/tool/memory collaborators.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use kafclaw_approval::{acknowledgement_text, ApprovalManager, ApprovalState};
use kafclaw_audit::{AuditChain, SecurityAuditRecorder};
use kafclaw_bus::{InboundBus, OutboundBus};
use kafclaw_context::{ContextBuilder, ContextRequest, HistoryMessage, ObservationNote, RecallResult, ToolSummary};
use kafclaw_core::{
    ApprovalId, Clock, InboundMessage, InboundMetadata, MessageType, OutboundMessage, RunId, SessionKey, TaskId, Tier,
    TraceId,
};
use kafclaw_expertise::{classify, Action, ExpertiseTracker, SkillEvent};
use kafclaw_llm::{CompletionParams, LlmProvider, LlmToolDefinition, Message, MessageRole, ToolCall, ToolCallResult};
use kafclaw_memory::{MemoryChunk, MemoryStore, ObservationQueue, ObservationStore, Priority, Reflector, TextCompressor};
use kafclaw_policy::{Decision, PolicyContext, PolicyDecision, PolicyEngine};
use kafclaw_tools::{truncate_for_log, ToolContext, ToolRegistry, TurnIdentity};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::attack_intent;
use crate::config::LoopConfig;
use crate::day2day::{self, Command as Day2DayCommand};
use crate::error::{RuntimeError, RuntimeResult};
use crate::indexer::AutoIndexer;
use crate::policy_store::PolicyDecisionStore;
use crate::quota;
use crate::session::{Session, SessionStore, StoredMessage};
use crate::subagent::{RunStatus, SubagentSupervisor, SubagentToolPolicy};
use crate::task::{AgentTask, TaskStatus, TaskStore};
use crate::timeline::{classification, TimelineEvent, TimelineStore};
use crate::turn::TurnContext;

/// Everything the Agent Loop owns or shares with the Sub-agent Supervisor.
/// Constructed once per agent process and handed to both the bus consumer
/// loop and the sub-agent launch dispatcher as an `Arc`.
pub struct AgentLoop {
    config: LoopConfig,
    clock: Arc<dyn Clock>,
    tasks: Arc<TaskStore>,
    sessions: Arc<SessionStore>,
    timeline: Arc<TimelineStore>,
    policy_decisions: Arc<PolicyDecisionStore>,
    approvals: Arc<ApprovalManager>,
    context_builder: Arc<ContextBuilder>,
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    memory: Arc<MemoryStore>,
    observation_queue: Arc<ObservationQueue>,
    observation_store: Arc<ObservationStore>,
    reflector: Arc<Reflector>,
    compressor: Arc<dyn TextCompressor>,
    expertise: Arc<ExpertiseTracker>,
    indexer: Arc<AutoIndexer>,
    subagents: Arc<SubagentSupervisor>,
    subagent_policy: Arc<SubagentToolPolicy>,
    outbound: Arc<OutboundBus>,
    security_audit: Arc<SecurityAuditRecorder>,
    audit_chain: Arc<AuditChain>,
    cancel: CancellationToken,
}

#[allow(clippy::too_many_arguments)]
impl AgentLoop {
    /// Build a new loop over every collaborator it drives. Callers (the
    /// process entry point) are responsible for constructing each
    /// collaborator over a shared storage backend.
    #[must_use]
    pub fn new(
        config: LoopConfig,
        clock: Arc<dyn Clock>,
        tasks: Arc<TaskStore>,
        sessions: Arc<SessionStore>,
        timeline: Arc<TimelineStore>,
        policy_decisions: Arc<PolicyDecisionStore>,
        approvals: Arc<ApprovalManager>,
        context_builder: Arc<ContextBuilder>,
        llm: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        memory: Arc<MemoryStore>,
        observation_queue: Arc<ObservationQueue>,
        observation_store: Arc<ObservationStore>,
        reflector: Arc<Reflector>,
        compressor: Arc<dyn TextCompressor>,
        expertise: Arc<ExpertiseTracker>,
        indexer: Arc<AutoIndexer>,
        subagents: Arc<SubagentSupervisor>,
        outbound: Arc<OutboundBus>,
        security_audit: Arc<SecurityAuditRecorder>,
        audit_chain: Arc<AuditChain>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            clock,
            tasks,
            sessions,
            timeline,
            policy_decisions,
            approvals,
            context_builder,
            llm,
            tools,
            memory,
            observation_queue,
            observation_store,
            reflector,
            compressor,
            expertise,
            indexer,
            subagents,
            subagent_policy: Arc::new(SubagentToolPolicy::new(&[], &[], &[])),
            outbound,
            security_audit,
            audit_chain,
            cancel,
        }
    }

    /// Replace the default (fully permissive) sub-agent tool policy.
    #[must_use]
    pub fn with_subagent_policy(mut self, policy: SubagentToolPolicy) -> Self {
        self.subagent_policy = Arc::new(policy);
        self
    }

    /// The root cancellation token governing this loop's shutdown.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the single inbound consumer until cancelled. Each message is
    /// processed on its own spawned task so a turn waiting on human
    /// approval never blocks the consumption of the next message —
    /// `InboundBus`'s "exactly one consumer" contract governs total
    /// *consumption* order, not serialized processing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bus's single consumer handle has
    /// already been taken by another caller.
    pub async fn run(self: Arc<Self>, bus: &InboundBus) -> RuntimeResult<()> {
        let mut consumer = bus
            .take_consumer()
            .await
            .ok_or_else(|| RuntimeError::InputInvalid("inbound bus consumer already taken".to_string()))?;

        while let Some(msg) = consumer.consume(&self.cancel).await {
            let loop_ref = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = loop_ref.process_message(msg).await {
                    warn!(error = %e, "turn processing failed");
                }
            });
        }
        Ok(())
    }

    /// Process one inbound message through the full turn sequence at
    /// nesting depth 0 (a top-level, non-sub-agent turn).
    ///
    /// # Errors
    ///
    /// Returns an error if a required collaborator's storage fails. Tool
    /// and LLM failures are caught and recorded on the returned task
    /// instead of propagating.
    pub async fn process_message(&self, msg: InboundMessage) -> RuntimeResult<AgentTask> {
        self.process_turn(msg, 0).await
    }

    /// Drive the launch channel the Sub-agent Supervisor hands newly
    /// spawned run ids on, executing each as its own turn at its run's
    /// recorded depth. Runs until the supervisor's sender side is
    /// dropped; callers typically `tokio::spawn` this once at startup.
    pub async fn run_subagent_dispatcher(self: Arc<Self>) {
        let Some(mut rx) = self.subagents.take_launch_receiver().await else {
            warn!("subagent launch receiver already taken; dispatcher not started");
            return;
        };
        while let Some(run_id) = rx.recv().await {
            let loop_ref = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = loop_ref.execute_subagent_run(run_id).await {
                    warn!(%run_id, error = %e, "subagent run execution failed");
                }
            });
        }
    }

    async fn execute_subagent_run(&self, run_id: RunId) -> RuntimeResult<()> {
        let Some(run) = self.subagents.get(run_id).await? else {
            return Ok(());
        };
        let synthetic = InboundMessage::new(
            "subagent",
            "subagent",
            run.label.clone(),
            run.task.clone(),
            Some(format!("subagent:{run_id}")),
        )
        .with_metadata(InboundMetadata {
            message_type: MessageType::Internal,
            ..InboundMetadata::default()
        });

        let outcome = self.process_turn(synthetic, run.depth).await;
        let (status, output) = match outcome {
            Ok(task) if task.status == TaskStatus::Completed => (RunStatus::Completed, task.content_out),
            Ok(task) => (RunStatus::Failed, task.error),
            Err(e) => (RunStatus::Failed, Some(e.to_string())),
        };

        self.subagents
            .complete(run_id, status, output, &run.requester_channel, &run.requester_chat_id, self.clock.now())
            .await
    }

    async fn process_turn(&self, msg: InboundMessage, depth: u32) -> RuntimeResult<AgentTask> {
        let now = self.clock.now();

        // Step 1: idempotency — an already-recorded key is a dedup hit,
        // not a new turn (spec §4.6 step 1, §8).
        if let Some(existing) = self.tasks.find_by_idempotency_key(&msg.idempotency_key).await? {
            debug!(idempotency_key = %msg.idempotency_key, "duplicate inbound message, returning prior task");
            return Ok(existing);
        }

        let trace_id = msg.trace_id;
        let task_id = TaskId::new();
        let turn = TurnContext::new(
            trace_id,
            task_id,
            msg.channel.clone(),
            msg.chat_id.clone(),
            msg.sender_id.clone(),
            msg.metadata.message_type,
        );
        let mut task = AgentTask::new(
            trace_id,
            msg.idempotency_key.clone(),
            msg.channel.clone(),
            msg.chat_id.clone(),
            msg.sender_id.clone(),
            msg.metadata.message_type,
            msg.content.clone(),
            now,
        );

        // Step 2: approval-reply interception — short-circuits before the
        // refusal gate and the LLM ever see it (spec §4.4, §4.6 step 2).
        if let Some((approval_id, approved)) = parse_approval_reply(&msg.content) {
            let ack = match self.approvals.respond(&approval_id, approved).await {
                Ok(()) => acknowledgement_text(&approval_id, approved),
                Err(_) => format!("Unknown approval id: {approval_id}"),
            };
            self.security_audit
                .record("approval_response", json!({"approval_id": approval_id.to_string(), "approved": approved}))
                .await
                .ok();
            task.content_out = Some(ack);
            task.status = TaskStatus::Completed;
            return self.tasks.insert(task).await;
        }

        // Step 3: attack-intent refusal gate (spec §4.6 step 3, §9).
        if attack_intent::matches(&msg.content) {
            self.security_audit
                .record("attack_intent_refused", json!({"trace_id": trace_id.to_string(), "sender": turn.sender_id}))
                .await
                .ok();
            task.content_out = Some(attack_intent::REFUSAL_TEXT.to_string());
            task.status = TaskStatus::Completed;
            return self.tasks.insert(task).await;
        }

        let session_key = turn.session_key();
        let mut session = self.sessions.load_or_new(&session_key, now).await?;

        // Step 4: Day2Day command interception — recognized and
        // acknowledged here; the on-disk markdown manipulation these
        // commands ultimately drive is out of this core's scope.
        if let Some(ack) = self.intercept_day2day(&msg.content, &mut session, now) {
            session.push(StoredMessage::from_message(&Message::user(msg.content.clone())), now);
            session.push(StoredMessage::from_message(&Message::assistant(ack.clone())), now);
            self.sessions.save(&session).await?;
            task.content_out = Some(ack);
            task.status = TaskStatus::Completed;
            return self.tasks.insert(task).await;
        }

        // Step 5: daily token quota (spec §4.6 step 7 as numbered in §4.6,
        // evaluated here before any LLM spend for this turn).
        if quota::is_exceeded(&self.tasks, now, self.config.daily_token_limit).await? {
            task.content_out = Some(quota::QUOTA_EXCEEDED_MESSAGE.to_string());
            task.status = TaskStatus::Completed;
            return self.tasks.insert(task).await;
        }

        // Step 6: context assembly.
        let built = self.build_context(&turn, &msg, &session).await?;
        if built.overflow.total > 0 {
            self.timeline
                .append(TimelineEvent::new(
                    trace_id,
                    classification::MEMORY_CONTEXT_OVERFLOW,
                    "",
                    json!({
                        "rag": built.overflow.rag,
                        "observation": built.overflow.observation,
                        "working_memory": built.overflow.working_memory,
                    }),
                    now,
                ))
                .await?;
        }

        // Step 7: bounded think/act loop.
        let history_len = session.history.len() as u64;
        let outcome = self
            .run_think_act_loop(&turn, &built.system_message, &built.history, &msg.content, depth)
            .await;

        match outcome {
            Ok((final_text, prompt_tokens, completion_tokens)) => {
                task.record_tokens(prompt_tokens, completion_tokens);
                task.content_out = Some(final_text.clone());
                task.status = TaskStatus::Completed;

                session.push(StoredMessage::from_message(&Message::user(msg.content.clone())), now);
                session.push(StoredMessage::from_message(&Message::assistant(final_text.clone())), now);

                self.indexer
                    .index_conversation_pair(&session_key.0, history_len, &msg.content, &final_text, now)
                    .await?;

                if self.observation_queue.record(&session_key.0, format!("User: {}\nAssistant: {final_text}", msg.content)).await? {
                    if let Err(e) = self
                        .observation_queue
                        .compress_and_advance(&session_key.0, self.compressor.as_ref(), &self.observation_store, now)
                        .await
                    {
                        warn!(error = %e, "observation compression failed");
                    }
                }
                if let Err(e) = self
                    .reflector
                    .reflect_session(&session_key.0, &self.observation_store, self.compressor.as_ref(), now)
                    .await
                {
                    warn!(error = %e, "observation reflection failed");
                }
            }
            Err(e) => {
                task.status = TaskStatus::Failed;
                task.error = Some(e.to_string());
            }
        }

        self.sessions.save(&session).await?;
        let stored = self.tasks.insert(task).await?;

        // Step 8: fire-and-forget audit shipping; never blocks or fails the turn.
        let audit = Arc::clone(&self.audit_chain);
        let payload = json!({
            "trace_id": trace_id.to_string(),
            "task_id": stored.id.to_string(),
            "status": format!("{:?}", stored.status),
        });
        match tokio::time::timeout(self.config.trace_publish_timeout, audit.append("turn_completed", payload)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "audit chain append failed"),
            Err(_) => warn!("audit chain append timed out"),
        }

        Ok(stored)
    }

    fn intercept_day2day(&self, content: &str, session: &mut Session, now: chrono::DateTime<chrono::Utc>) -> Option<String> {
        let today = now.date_naive();
        let capture_active = session
            .metadata
            .get("day2day_capture_active")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if let Some(cmd) = day2day::parse(content, today) {
            return Some(match cmd {
                Day2DayCommand::UpdateTasks => {
                    session.metadata.insert("day2day_capture_active".to_string(), json!(true));
                    session.metadata.insert("day2day_capture_lines".to_string(), json!([]));
                    "Day2Day: capture started. Send lines, then `dtc` to commit.".to_string()
                }
                Day2DayCommand::Progress(note) => format!("Day2Day: progress noted ({note})."),
                Day2DayCommand::Consolidate => {
                    "Day2Day: consolidate recognized (file operations are out of scope for this core)."
                        .to_string()
                }
                Day2DayCommand::NextStep => {
                    "Day2Day: next-step recognized (file operations are out of scope for this core)."
                        .to_string()
                }
                Day2DayCommand::AllOpen => {
                    "Day2Day: all-open recognized (file operations are out of scope for this core)."
                        .to_string()
                }
                Day2DayCommand::CloseCapture => {
                    let lines: Vec<String> = session
                        .metadata
                        .get("day2day_capture_lines")
                        .and_then(|v| v.as_array())
                        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                        .unwrap_or_default();
                    session.metadata.insert("day2day_capture_active".to_string(), json!(false));
                    session.metadata.remove("day2day_capture_lines");
                    format!("Day2Day: capture committed ({} lines).", lines.len())
                }
                Day2DayCommand::StatusQuery { date } => match date {
                    Some(d) => format!("Day2Day: status for {d} recognized (file operations are out of scope for this core)."),
                    None => "Day2Day: status recognized (file operations are out of scope for this core).".to_string(),
                },
            });
        }

        if capture_active {
            let mut lines: Vec<String> = session
                .metadata
                .get("day2day_capture_lines")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            lines.push(content.to_string());
            session.metadata.insert("day2day_capture_lines".to_string(), json!(lines));
            return Some("Day2Day: line captured.".to_string());
        }

        None
    }

    async fn build_context(
        &self,
        turn: &TurnContext,
        msg: &InboundMessage,
        session: &Session,
    ) -> RuntimeResult<kafclaw_context::BuiltContext> {
        let tool_definitions = self.tools.all_definitions();
        let tool_summaries: Vec<ToolSummary> = tool_definitions
            .iter()
            .map(|d| ToolSummary {
                name: d.name.clone(),
                description: d.description.clone(),
                tier: d.tier.as_u8(),
            })
            .collect();

        let observations_raw = self.observation_store.list_for_session(&turn.session_key().0).await?;
        let observation_notes: Vec<ObservationNote> = observations_raw
            .iter()
            .map(|o| ObservationNote {
                date: o.observed_at.format("%Y-%m-%d").to_string(),
                priority: priority_str(o.priority).to_string(),
                content: o.content.clone(),
            })
            .collect();

        let history_msgs: Vec<HistoryMessage> = session
            .history
            .iter()
            .map(|m| HistoryMessage {
                role: role_str(m.role).to_string(),
                content: m.text.clone(),
            })
            .collect();

        let chunks = self.memory.list_all().await?;
        let rag_results = keyword_recall(&chunks, &msg.content, self.config.max_rag_top_k * 4);

        let req = ContextRequest {
            agent_name: &self.config.agent_name,
            workspace_root: &self.config.workspace_root,
            channel: &turn.channel,
            chat_id: &turn.chat_id,
            message_type: turn.message_type,
            user_message: &msg.content,
            tools: &tool_summaries,
            legacy_static_memory: "",
            working_memory_resource_scoped: &[],
            working_memory_thread_scoped: &[],
            observations: &observation_notes,
            rag_results: &rag_results,
            rag_score_threshold: self.config.rag_score_threshold,
            rag_top_k: self.config.rag_top_k,
            max_rag_top_k: self.config.max_rag_top_k,
            history: &history_msgs,
        };

        Ok(self.context_builder.build(self.clock.as_ref(), &req))
    }

    /// Run up to `max_iterations` think/act rounds, dispatching every tool
    /// call through the policy ladder and (when required) the approval
    /// wait, and returns the final assistant text plus accumulated token
    /// usage.
    async fn run_think_act_loop(
        &self,
        turn: &TurnContext,
        system_message: &str,
        built_history: &[HistoryMessage],
        user_message: &str,
        depth: u32,
    ) -> RuntimeResult<(String, u64, u64)> {
        let tool_definitions = self.tools.all_definitions();
        let llm_tools: Vec<LlmToolDefinition> = tool_definitions
            .iter()
            .map(|d| LlmToolDefinition::new(d.name.clone()).with_description(d.description.clone()).with_schema(d.parameters.clone()))
            .collect();

        let mut messages: Vec<Message> = built_history
            .iter()
            .map(|h| match h.role.as_str() {
                "assistant" => Message::assistant(h.content.clone()),
                "system" => Message::system(h.content.clone()),
                "tool" => Message::tool_result(ToolCallResult::success("history", h.content.clone())),
                _ => Message::user(h.content.clone()),
            })
            .collect();
        messages.push(Message::user(user_message.to_string()));

        let policy_engine = PolicyEngine::from_settings(self.config.policy_limits.clone());
        let mut prompt_tokens = 0u64;
        let mut completion_tokens = 0u64;

        for iteration in 1..=self.config.max_iterations {
            let params = CompletionParams::new(self.config.model.clone());
            let response = self.llm.complete(&messages, &llm_tools, system_message, &params).await?;
            prompt_tokens = prompt_tokens.saturating_add(response.usage.input_tokens as u64);
            completion_tokens = completion_tokens.saturating_add(response.usage.output_tokens as u64);

            let tool_calls: Vec<ToolCall> = response.message.tool_calls().map(<[ToolCall]>::to_vec).unwrap_or_default();
            let response_text = response.message.text().unwrap_or_default().to_string();
            let span_text = if response_text.is_empty() {
                format!("{} tool call(s) requested", tool_calls.len())
            } else {
                response_text.clone()
            };
            self.timeline
                .append(TimelineEvent::new(turn.trace_id, classification::LLM, span_text, json!({"iteration": iteration}), self.clock.now()))
                .await?;

            let has_tool_calls = response.has_tool_calls;
            messages.push(response.message);

            if !has_tool_calls || tool_calls.is_empty() {
                return Ok((response_text, prompt_tokens, completion_tokens));
            }

            for call in tool_calls {
                let tool_result = self.execute_one_tool_call(turn, &policy_engine, &call, depth).await;
                self.timeline
                    .append(TimelineEvent::new(
                        turn.trace_id,
                        classification::TOOL,
                        truncate_for_log(&tool_result),
                        json!({"tool": call.name}),
                        self.clock.now(),
                    ))
                    .await?;

                let is_error = tool_result.starts_with("Error:");
                if let Err(e) = self
                    .indexer
                    .index_tool_result(&turn.trace_id.to_string(), &call.name, &tool_result, self.clock.now())
                    .await
                {
                    warn!(error = %e, "tool result indexing failed");
                }
                let event = SkillEvent {
                    skill_name: classify(&call.name).to_string(),
                    action: if is_error { Action::Other } else { Action::ToolUsed },
                    quality: if is_error { 0.2 } else { 0.9 },
                    duration_ms: 0,
                    recorded_at: self.clock.now(),
                };
                if let Err(e) = self.expertise.record_event(event).await {
                    warn!(error = %e, "expertise event recording failed");
                }

                messages.push(Message::tool_result(if is_error {
                    ToolCallResult::error(call.id.clone(), tool_result)
                } else {
                    ToolCallResult::success(call.id.clone(), tool_result)
                }));
            }
        }

        Ok((
            "I wasn't able to finish this within the allotted steps. Please try rephrasing or breaking the task down.".to_string(),
            prompt_tokens,
            completion_tokens,
        ))
    }

    async fn execute_one_tool_call(&self, turn: &TurnContext, policy_engine: &PolicyEngine, call: &ToolCall, depth: u32) -> String {
        if depth > 0 {
            if let Some(reason) = self.subagent_policy.check_tool(&call.name, depth, crate::subagent::DEFAULT_MAX_DEPTH) {
                return format!("Error: denied by sub-agent policy ({reason})");
            }
        }

        let tier = self.tools.get(&call.name).map(|t| t.tier()).unwrap_or(Tier::HighRisk);
        let ctx = PolicyContext {
            sender: turn.sender_id.clone(),
            channel: turn.channel.clone(),
            tool: call.name.clone(),
            tier,
            args: call.arguments.clone(),
            trace_id: turn.trace_id,
            task_id: turn.task_id,
            message_type: turn.message_type,
        };
        let decision = policy_engine.evaluate(&ctx);
        if let Err(e) = self.policy_decisions.record(&PolicyDecision::from_context(&ctx, &decision)).await {
            warn!(error = %e, "policy decision persistence failed");
        }
        self.security_audit
            .record(
                "policy_decision",
                json!({
                    "trace_id": turn.trace_id.to_string(),
                    "tool": call.name,
                    "tier": tier.as_u8(),
                    "allowed": decision.allow,
                    "requires_approval": decision.requires_approval,
                    "reason": decision.reason,
                }),
            )
            .await
            .ok();

        if !decision.allow {
            return format!("Error: denied by policy ({})", decision.reason);
        }

        if decision.requires_approval {
            let now = self.clock.now();
            let request = self.approvals.create(
                call.name.clone(),
                tier,
                call.arguments.clone(),
                turn.sender_id.clone(),
                turn.channel.clone(),
                turn.chat_id.clone(),
                turn.trace_id,
                turn.task_id,
                now,
            );
            let truncated_args = truncate_for_log(&call.arguments.to_string());
            self.outbound.publish(OutboundMessage {
                channel: turn.channel.clone(),
                chat_id: turn.chat_id.clone(),
                trace_id: turn.trace_id,
                task_id: turn.task_id,
                content: request.prompt_text(&truncated_args),
            });
            self.security_audit
                .record("approval_requested", json!({"approval_id": request.approval_id.to_string(), "tool": call.name}))
                .await
                .ok();

            let state = match self
                .approvals
                .wait_cancellable(&request.approval_id, self.config.approval_timeout, &self.cancel)
                .await
            {
                Ok(state) => state,
                Err(e) => return format!("Error: approval wait failed: {e}"),
            };
            return match state {
                ApprovalState::Approved => self.dispatch_tool(call, turn, depth).await,
                ApprovalState::Denied => "Error: denied by approver".to_string(),
                ApprovalState::Pending | ApprovalState::Timeout => "Error: approval timed out".to_string(),
            };
        }

        self.dispatch_tool(call, turn, depth).await
    }

    async fn dispatch_tool(&self, call: &ToolCall, turn: &TurnContext, depth: u32) -> String {
        let tool_ctx = ToolContext::new(self.config.workspace_root.clone()).with_turn(TurnIdentity {
            trace_id: turn.trace_id,
            channel: turn.channel.clone(),
            chat_id: turn.chat_id.clone(),
            session_key: turn.session_key().0,
            depth,
        });
        match self.tools.dispatch(&call.name, call.arguments.clone(), &tool_ctx).await {
            Ok(result) => result,
            Err(e) => format!("Error: {e}"),
        }
    }
}

fn parse_approval_reply(content: &str) -> Option<(ApprovalId, bool)> {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("approve:") {
        return Some((ApprovalId(rest.trim().to_string()), true));
    }
    if let Some(rest) = trimmed.strip_prefix("deny:") {
        return Some((ApprovalId(rest.trim().to_string()), false));
    }
    None
}

fn priority_str(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

fn role_str(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

/// Score stored chunks against `query` by word overlap and return the
/// highest-scoring `limit` as [`RecallResult`]s.
///
/// This workspace never generates embeddings (concrete LLM transports,
/// and therefore embedding calls, are out of scope per spec §1), so a
/// deterministic keyword-overlap heuristic stands in as the recall
/// signal; [`ContextRequest`]'s own score threshold and top-K clamp
/// still apply downstream.
fn keyword_recall(chunks: &[MemoryChunk], query: &str, limit: usize) -> Vec<RecallResult> {
    let query_words: HashSet<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
    if query_words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<RecallResult> = chunks
        .iter()
        .filter_map(|chunk| {
            let content_words: HashSet<String> = chunk.content.to_lowercase().split_whitespace().map(String::from).collect();
            let overlap = query_words.intersection(&content_words).count();
            if overlap == 0 {
                return None;
            }
            Some(RecallResult {
                content: chunk.content.clone(),
                score: overlap as f64 / query_words.len() as f64,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kafclaw_audit::AuditChain;
    use kafclaw_context::ContextBudget;
    use kafclaw_core::{FakeClock, MessageType, SystemClock};
    use kafclaw_llm::{LlmError, LlmResponse, LlmResult, StopReason, Usage};
    use kafclaw_memory::MemoryError;
    use kafclaw_policy::PolicyLimits;
    use kafclaw_storage::{KvStore, MemoryKvStore};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tempfile::tempdir;

    struct StubProvider {
        calls: AtomicUsize,
        wants_tool: bool,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[LlmToolDefinition],
            _system: &str,
            _params: &CompletionParams,
        ) -> LlmResult<LlmResponse> {
            let call_index = self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.wants_tool && call_index == 0 {
                return Ok(LlmResponse {
                    message: Message::assistant_with_tools(vec![ToolCall::new("c1", "read_file").with_arguments(json!({"path": "x.txt"}))]),
                    has_tool_calls: true,
                    stop_reason: StopReason::ToolUse,
                    usage: Usage { input_tokens: 10, output_tokens: 5 },
                });
            }
            Ok(LlmResponse {
                message: Message::assistant("all done"),
                has_tool_calls: false,
                stop_reason: StopReason::EndTurn,
                usage: Usage { input_tokens: 10, output_tokens: 5 },
            })
        }

        fn max_context_length(&self) -> usize {
            32_000
        }
    }

    struct NeverEndingProvider;

    #[async_trait]
    impl LlmProvider for NeverEndingProvider {
        fn name(&self) -> &str {
            "never-ending"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[LlmToolDefinition],
            _system: &str,
            _params: &CompletionParams,
        ) -> LlmResult<LlmResponse> {
            Ok(LlmResponse {
                message: Message::assistant_with_tools(vec![ToolCall::new("c1", "read_file").with_arguments(json!({"path": "x.txt"}))]),
                has_tool_calls: true,
                stop_reason: StopReason::ToolUse,
                usage: Usage::default(),
            })
        }

        fn max_context_length(&self) -> usize {
            32_000
        }
    }

    struct NoopCompressor;

    #[async_trait]
    impl TextCompressor for NoopCompressor {
        async fn compress(&self, _prompt: &str, _input: &str) -> Result<String, MemoryError> {
            Ok(String::new())
        }
    }

    fn make_loop(llm: Arc<dyn LlmProvider>) -> (Arc<AgentLoop>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let sessions = Arc::new(SessionStore::new(backend.clone()));
        let outbound = Arc::new(OutboundBus::new());
        let tools = Arc::new(ToolRegistry::with_defaults());
        let memory = Arc::new(MemoryStore::new(backend.clone()));

        let loop_ = AgentLoop::new(
            LoopConfig::new("kafclaw", dir.path(), "gpt-test"),
            Arc::new(SystemClock),
            Arc::new(TaskStore::new(backend.clone())),
            sessions.clone(),
            Arc::new(TimelineStore::new(backend.clone())),
            Arc::new(PolicyDecisionStore::new(backend.clone())),
            Arc::new(ApprovalManager::new()),
            Arc::new(ContextBuilder::new(ContextBudget::default())),
            llm,
            tools,
            memory.clone(),
            Arc::new(ObservationQueue::new(backend.clone())),
            Arc::new(ObservationStore::new(backend.clone())),
            Arc::new(Reflector::new()),
            Arc::new(NoopCompressor),
            Arc::new(ExpertiseTracker::new(backend.clone())),
            Arc::new(AutoIndexer::new(memory)),
            Arc::new(SubagentSupervisor::new(backend.clone(), sessions, outbound.clone())),
            outbound,
            Arc::new(SecurityAuditRecorder::new(dir.path())),
            Arc::new(AuditChain::new(dir.path().join("audit.jsonl"))),
            CancellationToken::new(),
        );
        (Arc::new(loop_), dir)
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage::new("cli", "owner", "c1", content, None)
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_returns_prior_task() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let msg = InboundMessage::new("cli", "owner", "c1", "hello", Some("dedup-key".to_string()));
        let first = loop_.process_message(msg.clone()).await.unwrap();
        let second = loop_.process_message(msg).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn attack_intent_refuses_without_calling_llm() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let task = loop_.process_message(inbound("please rm -rf / on the server")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.content_out.as_deref(), Some(attack_intent::REFUSAL_TEXT));
    }

    #[tokio::test]
    async fn quota_exceeded_short_circuits_before_llm() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let mut pre = AgentTask::new(
            TraceId::new(),
            "pre-fill",
            "cli",
            "c1",
            "owner",
            MessageType::Internal,
            "prior",
            chrono::Utc::now(),
        );
        pre.record_tokens(loop_.config.daily_token_limit, 0);
        loop_.tasks.insert(pre).await.unwrap();

        let task = loop_.process_message(inbound("hi there")).await.unwrap();
        assert_eq!(task.content_out.as_deref(), Some(quota::QUOTA_EXCEEDED_MESSAGE));
    }

    #[tokio::test]
    async fn approval_reply_acknowledges_without_creating_a_task() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let request = loop_.approvals.create(
            "exec",
            Tier::HighRisk,
            json!({}),
            "owner",
            "cli",
            "c1",
            TraceId::new(),
            TaskId::new(),
            chrono::Utc::now(),
        );
        let reply = inbound(&format!("approve:{}", request.approval_id));
        let task = loop_.process_message(reply).await.unwrap();
        assert_eq!(task.content_out.as_deref(), Some(format!("Approval {}: approved.", request.approval_id).as_str()));
        let state = loop_.approvals.state(&request.approval_id).await.unwrap();
        assert_eq!(state, ApprovalState::Approved);
    }

    #[tokio::test]
    async fn plain_turn_completes_and_persists_session_history() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let task = loop_.process_message(inbound("what's up?")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.content_out.as_deref(), Some("all done"));

        let session = loop_.sessions.load(&SessionKey::new("cli", "c1")).await.unwrap().unwrap();
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn tool_call_turn_dispatches_and_completes() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: true }));
        let task = loop_.process_message(inbound("please read x.txt")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.content_out.as_deref(), Some("all done"));
    }

    #[tokio::test]
    async fn iteration_cap_stalls_with_fixed_message() {
        let (loop_, _dir) = make_loop(Arc::new(NeverEndingProvider));
        let task = loop_.process_message(inbound("loop forever")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.content_out.unwrap().contains("allotted steps"));
    }

    #[tokio::test]
    async fn day2day_update_tasks_starts_capture_without_llm_call() {
        let provider = Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false });
        let (loop_, _dir) = make_loop(provider.clone());
        let task = loop_.process_message(inbound("dtu")).await.unwrap();
        assert!(task.content_out.unwrap().contains("capture started"));
        assert_eq!(provider.calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fake_clock_drives_deterministic_quota_window() {
        let (loop_, _dir) = make_loop(Arc::new(StubProvider { calls: AtomicUsize::new(0), wants_tool: false }));
        let clock = FakeClock::new(chrono::Utc::now());
        assert!(!quota::is_exceeded(&loop_.tasks, clock.now(), loop_.config.daily_token_limit).await.unwrap());
    }
}
