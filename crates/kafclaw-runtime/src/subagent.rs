//! C8 Sub-agent Supervisor (spec §4.7): spawns bounded child agent runs
//! and routes their completion announcements back to the requester, with
//! deferred retry when the first publish attempt has no route.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use kafclaw_bus::OutboundBus;
use kafclaw_core::{OutboundMessage, RunId, SessionKey, TaskId, TraceId};
use kafclaw_storage::{KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};

use crate::error::{RuntimeError, RuntimeResult};
use crate::session::SessionStore;

const NAMESPACE: &str = "subagent_runs";

/// Default interval between deferred-announcement retry attempts.
pub const DEFAULT_RETRY_INTERVAL: chrono::Duration = chrono::Duration::seconds(30);

/// Default nesting cap (spec §4.7 `MaxSubagentSpawnDepth`).
pub const DEFAULT_MAX_DEPTH: u32 = 3;
/// Default concurrent-children cap (spec §4.7 `MaxSubagentChildren`).
pub const DEFAULT_MAX_CHILDREN: usize = 5;

/// Reason strings the sub-agent derived policy produces (spec §4.7), kept
/// as constants alongside `kafclaw_policy::reasons` rather than folded
/// into it since the base policy engine has no concept of nesting depth.
pub mod reasons {
    pub const TOOL_DENIED_BY_POLICY: &str = "subagent_tool_denied_by_policy";
    pub const SPAWN_DEPTH_LIMIT: &str = "subagent_spawn_depth_limit";
}

/// Lifecycle status of a [`SubagentRun`] (spec §3, §12 Open Question
/// resolution: consumers tolerate any lowercase form of the four
/// terminal states).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Timeout,
    Killed,
}

impl RunStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Killed => "killed",
        }
    }
}

/// Whether a child session is retained or removed after a successful
/// completion announcement (spec GLOSSARY "Cleanup policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    Keep,
    Delete,
}

/// One spawned child agent run (spec §3 `SubagentRun`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubagentRun {
    pub run_id: RunId,
    pub parent_session: String,
    pub root_session: String,
    pub requester_channel: String,
    pub requester_chat_id: String,
    pub requester_trace: TraceId,
    pub task: String,
    pub label: String,
    pub depth: u32,
    pub cleanup: CleanupPolicy,
    pub status: RunStatus,
    pub completion_output: Option<String>,
    pub announce_id: String,
    pub next_announce_at: Option<DateTime<Utc>>,
    pub announced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inputs to [`SubagentSupervisor::spawn`].
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub parent_session: SessionKey,
    pub root_session: SessionKey,
    pub requester_channel: String,
    pub requester_chat_id: String,
    pub requester_trace: TraceId,
    pub task: String,
    pub label: String,
    pub parent_depth: u32,
    pub cleanup: CleanupPolicy,
}

/// Tool-name allow/deny policy applied inside a child run (spec §4.7).
#[derive(Debug, Clone)]
pub struct SubagentToolPolicy {
    allow: Option<GlobSet>,
    deny: GlobSet,
    allowed_agents: HashSet<String>,
}

impl SubagentToolPolicy {
    /// Build from glob pattern lists. An empty `allow` list means "no
    /// restriction beyond deny" (spec §4.7: the allow list only
    /// constrains when non-empty, mirroring the base policy's
    /// `AllowedSenders` semantics).
    ///
    /// # Panics
    ///
    /// Panics if a pattern fails to compile as a glob — patterns come
    /// from settings, not attacker input, so a malformed pattern is an
    /// operator configuration error surfaced at startup.
    #[must_use]
    pub fn new(allow: &[String], deny: &[String], allowed_agents: &[String]) -> Self {
        let compile = |patterns: &[String]| -> GlobSet {
            let mut builder = GlobSetBuilder::new();
            for p in patterns {
                builder.add(Glob::new(p).expect("valid glob pattern in subagent tool policy"));
            }
            builder.build().expect("subagent tool glob set compiles")
        };

        Self {
            allow: if allow.is_empty() { None } else { Some(compile(allow)) },
            deny: compile(deny),
            allowed_agents: allowed_agents.iter().cloned().collect(),
        }
    }

    /// Evaluate whether `tool_name` may run inside a child at `depth`.
    /// Returns `None` when the base policy should still be consulted
    /// (i.e. this derived layer did not itself reject the call), `Some`
    /// with a reason string on rejection.
    #[must_use]
    pub fn check_tool(&self, tool_name: &str, depth: u32, max_depth: u32) -> Option<&'static str> {
        if tool_name == "sessions_spawn" && depth >= max_depth {
            return Some(reasons::SPAWN_DEPTH_LIMIT);
        }
        if self.deny.is_match(tool_name) {
            return Some(reasons::TOOL_DENIED_BY_POLICY);
        }
        if let Some(allow) = &self.allow {
            if !allow.is_match(tool_name) {
                return Some(reasons::TOOL_DENIED_BY_POLICY);
            }
        }
        None
    }

    /// Default policy: only the current agent id may be targeted unless
    /// explicitly allowed (spec §4.7).
    #[must_use]
    pub fn agent_allowed(&self, agent_id: &str, current_agent_id: &str) -> bool {
        agent_id == current_agent_id || self.allowed_agents.contains(agent_id)
    }
}

/// Persists [`SubagentRun`]s keyed by [`RunId`].
pub struct SubagentStore {
    kv: ScopedKvStore,
}

impl SubagentStore {
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    pub async fn get(&self, id: RunId) -> RuntimeResult<Option<SubagentRun>> {
        match self.kv.get(&id.to_string()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn put(&self, run: &SubagentRun) -> RuntimeResult<()> {
        let bytes = serde_json::to_vec(run)?;
        self.kv.set(&run.run_id.to_string(), bytes).await?;
        Ok(())
    }

    pub async fn list_all(&self) -> RuntimeResult<Vec<SubagentRun>> {
        let keys = self.kv.list_keys().await?;
        let mut runs = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.kv.get(&key).await? {
                runs.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(runs)
    }
}

/// Governs sub-agent spawn/list/kill/steer and completion-announcement
/// delivery.
pub struct SubagentSupervisor {
    runs: SubagentStore,
    sessions: Arc<SessionStore>,
    outbound: Arc<OutboundBus>,
    max_depth: u32,
    max_children: usize,
    retry_interval: chrono::Duration,
    // The Supervisor never calls back into the Agent Loop directly — it
    // hands newly spawned run ids to whoever holds the receiver (the loop's
    // launch task). Avoids a Loop <-> Supervisor reference cycle.
    launch_tx: mpsc::UnboundedSender<RunId>,
    launch_rx: Mutex<Option<mpsc::UnboundedReceiver<RunId>>>,
}

impl SubagentSupervisor {
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>, sessions: Arc<SessionStore>, outbound: Arc<OutboundBus>) -> Self {
        let (launch_tx, launch_rx) = mpsc::unbounded_channel();
        Self {
            runs: SubagentStore::new(backend),
            sessions,
            outbound,
            max_depth: DEFAULT_MAX_DEPTH,
            max_children: DEFAULT_MAX_CHILDREN,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            launch_tx,
            launch_rx: Mutex::new(Some(launch_rx)),
        }
    }

    /// Take ownership of the channel newly spawned run ids arrive on.
    /// Callable once; subsequent calls return `None`. The Agent Loop's
    /// launch task owns the receiver for the supervisor's lifetime.
    pub async fn take_launch_receiver(&self) -> Option<mpsc::UnboundedReceiver<RunId>> {
        self.launch_rx.lock().await.take()
    }

    #[must_use]
    pub fn with_limits(mut self, max_depth: u32, max_children: usize) -> Self {
        self.max_depth = max_depth;
        self.max_children = max_children;
        self
    }

    /// Spawn a new child run, rejecting depth or concurrency overflow.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SubagentOverflow`] if the depth or
    /// concurrent-children cap would be exceeded, or a storage error.
    pub async fn spawn(&self, req: SpawnRequest, now: DateTime<Utc>) -> RuntimeResult<SubagentRun> {
        let depth = req.parent_depth + 1;
        if depth > self.max_depth {
            return Err(RuntimeError::SubagentOverflow(format!(
                "spawn depth {depth} exceeds max {}",
                self.max_depth
            )));
        }

        let siblings = self.children_of(&req.parent_session).await?;
        let active = siblings.iter().filter(|r| !r.status.is_terminal()).count();
        if active >= self.max_children {
            return Err(RuntimeError::SubagentOverflow(format!(
                "active children {active} at or above max {}",
                self.max_children
            )));
        }

        let run = SubagentRun {
            run_id: RunId::new(),
            parent_session: req.parent_session.to_string(),
            root_session: req.root_session.to_string(),
            requester_channel: req.requester_channel,
            requester_chat_id: req.requester_chat_id,
            requester_trace: req.requester_trace,
            task: req.task,
            label: req.label,
            depth,
            cleanup: req.cleanup,
            status: RunStatus::Pending,
            completion_output: None,
            announce_id: RunId::new().to_string(),
            next_announce_at: None,
            announced: false,
            created_at: now,
            updated_at: now,
        };
        self.runs.put(&run).await?;
        let _ = self.launch_tx.send(run.run_id);
        Ok(run)
    }

    async fn children_of(&self, parent_session: &SessionKey) -> RuntimeResult<Vec<SubagentRun>> {
        let all = self.runs.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|r| r.parent_session == parent_session.to_string())
            .collect())
    }

    /// List every tracked run.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list(&self) -> RuntimeResult<Vec<SubagentRun>> {
        self.runs.list_all().await
    }

    /// Look up a single run by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn get(&self, run_id: RunId) -> RuntimeResult<Option<SubagentRun>> {
        self.runs.get(run_id).await
    }

    /// Mark a run killed, if not already terminal.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownTask`]-shaped lookup failure via the
    /// underlying store if `run_id` is unknown, or a storage error.
    pub async fn kill(&self, run_id: RunId, now: DateTime<Utc>) -> RuntimeResult<()> {
        let mut run = self
            .runs
            .get(run_id)
            .await?
            .ok_or(RuntimeError::UnknownSubagentRun(run_id))?;
        if !run.status.is_terminal() {
            run.status = RunStatus::Killed;
            run.updated_at = now;
            self.runs.put(&run).await?;
        }
        Ok(())
    }

    /// Append a new turn to a still-running child's session (spec §4.7
    /// `Steer`).
    ///
    /// # Errors
    ///
    /// Returns an error if the run is unknown, already terminal, or the
    /// session store fails.
    pub async fn steer(&self, run_id: RunId, new_input: &str, now: DateTime<Utc>) -> RuntimeResult<()> {
        let run = self
            .runs
            .get(run_id)
            .await?
            .ok_or(RuntimeError::UnknownSubagentRun(run_id))?;
        if run.status.is_terminal() {
            return Err(RuntimeError::InputInvalid(format!(
                "subagent run {run_id} is already terminal, cannot steer"
            )));
        }
        let key = SessionKey::subagent(&run.label);
        let mut session = self.sessions.load_or_new(&key, now).await?;
        session.push(
            crate::session::StoredMessage {
                role: kafclaw_llm::MessageRole::User,
                text: new_input.to_string(),
            },
            now,
        );
        self.sessions.save(&session).await?;
        Ok(())
    }

    /// Record a run's completion and attempt to announce it immediately.
    /// If the attempt finds no subscriber, schedules a retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to read or write.
    pub async fn complete(
        &self,
        run_id: RunId,
        status: RunStatus,
        output: Option<String>,
        active_channel: &str,
        active_chat_id: &str,
        now: DateTime<Utc>,
    ) -> RuntimeResult<()> {
        let mut run = self
            .runs
            .get(run_id)
            .await?
            .ok_or(RuntimeError::UnknownSubagentRun(run_id))?;
        run.status = status;
        run.completion_output = output;
        run.updated_at = now;

        let delivered = self.try_announce(&run, active_channel, active_chat_id);
        if delivered {
            run.announced = true;
            if run.cleanup == CleanupPolicy::Delete {
                self.sessions.delete(&SessionKey::subagent(&run.label)).await?;
            }
        } else {
            run.next_announce_at = Some(now + self.retry_interval);
        }
        self.runs.put(&run).await?;
        Ok(())
    }

    /// Process every run with a due, undelivered announcement. Returns
    /// the number successfully delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to read or write.
    pub async fn retry_announcements(&self, now: DateTime<Utc>) -> RuntimeResult<usize> {
        let mut delivered_count = 0;
        for mut run in self.runs.list_all().await? {
            if run.announced || !run.status.is_terminal() {
                continue;
            }
            let Some(due) = run.next_announce_at else { continue };
            if due > now {
                continue;
            }
            let delivered = self.try_announce(&run, &run.requester_channel.clone(), &run.requester_chat_id.clone());
            if delivered {
                run.announced = true;
                delivered_count += 1;
                if run.cleanup == CleanupPolicy::Delete {
                    self.sessions.delete(&SessionKey::subagent(&run.label)).await?;
                }
            } else {
                run.next_announce_at = Some(now + self.retry_interval);
            }
            self.runs.put(&run).await?;
        }
        Ok(delivered_count)
    }

    fn try_announce(&self, run: &SubagentRun, active_channel: &str, active_chat_id: &str) -> bool {
        let (channel, chat_id) = resolve_announce_target(run, active_channel, active_chat_id);
        let text = announcement_text(run);
        let count = self.outbound.publish(OutboundMessage {
            channel,
            chat_id,
            trace_id: run.requester_trace,
            task_id: TaskId::new(),
            content: text,
        });
        count > 0
    }
}

/// Resolve the channel/chat a completion announcement should be
/// delivered to, by the fallback order spec §4.7 names: explicit
/// requester fields → `requestedBy` session key split → root session →
/// active channel/chat.
#[must_use]
pub fn resolve_announce_target(run: &SubagentRun, active_channel: &str, active_chat_id: &str) -> (String, String) {
    if !run.requester_channel.is_empty() && !run.requester_chat_id.is_empty() {
        return (run.requester_channel.clone(), run.requester_chat_id.clone());
    }
    if let Some((channel, chat_id)) = run.parent_session.split_once(':') {
        return (channel.to_string(), chat_id.to_string());
    }
    if let Some((channel, chat_id)) = run.root_session.split_once(':') {
        return (channel.to_string(), chat_id.to_string());
    }
    (active_channel.to_string(), active_chat_id.to_string())
}

/// Build the `[subagent <runID>] Status: ...\nResult: ...` announcement
/// text (spec §4.7). Returns `None` if the completion output is the
/// `ANNOUNCE_SKIP` sentinel — no announcement should be sent.
#[must_use]
pub fn announcement_text(run: &SubagentRun) -> String {
    let result = run.completion_output.clone().unwrap_or_default();
    format!(
        "[subagent {}] Status: {}\nResult: {}",
        run.run_id,
        run.status.as_str(),
        result
    )
}

/// Whether a free-form completion block asked to suppress the
/// announcement entirely (spec §4.7 `ANNOUNCE_SKIP` sentinel).
#[must_use]
pub fn is_announce_skip(output: &str) -> bool {
    output.trim() == "ANNOUNCE_SKIP"
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;

    fn supervisor() -> SubagentSupervisor {
        let backend: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let sessions = Arc::new(SessionStore::new(backend.clone()));
        let outbound = Arc::new(OutboundBus::new());
        SubagentSupervisor::new(backend, sessions, outbound)
    }

    fn spawn_req(parent_depth: u32) -> SpawnRequest {
        SpawnRequest {
            parent_session: SessionKey::new("cli", "c1"),
            root_session: SessionKey::new("cli", "c1"),
            requester_channel: "cli".to_string(),
            requester_chat_id: "c1".to_string(),
            requester_trace: TraceId::new(),
            task: "research something".to_string(),
            label: "researcher".to_string(),
            parent_depth,
            cleanup: CleanupPolicy::Keep,
        }
    }

    #[tokio::test]
    async fn spawn_beyond_max_depth_is_rejected() {
        let sup = supervisor().with_limits(1, 5);
        let err = sup.spawn(spawn_req(1), Utc::now()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::SubagentOverflow(_)));
    }

    #[tokio::test]
    async fn spawn_within_depth_succeeds() {
        let sup = supervisor().with_limits(3, 5);
        let run = sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        assert_eq!(run.depth, 1);
        assert_eq!(run.status, RunStatus::Pending);
    }

    #[tokio::test]
    async fn spawn_beyond_max_children_is_rejected() {
        let sup = supervisor().with_limits(3, 1);
        sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        let err = sup.spawn(spawn_req(0), Utc::now()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::SubagentOverflow(_)));
    }

    #[tokio::test]
    async fn kill_marks_non_terminal_run_killed() {
        let sup = supervisor();
        let run = sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        sup.kill(run.run_id, Utc::now()).await.unwrap();
        let updated = sup.runs.get(run.run_id).await.unwrap().unwrap();
        assert_eq!(updated.status, RunStatus::Killed);
    }

    #[tokio::test]
    async fn complete_without_subscriber_schedules_retry() {
        let sup = supervisor();
        let run = sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        let now = Utc::now();
        sup.complete(run.run_id, RunStatus::Completed, Some("done".to_string()), "cli", "c1", now)
            .await
            .unwrap();
        let updated = sup.runs.get(run.run_id).await.unwrap().unwrap();
        assert!(!updated.announced);
        assert!(updated.next_announce_at.is_some());
    }

    #[tokio::test]
    async fn retry_announcements_delivers_once_subscriber_attaches() {
        let sup = supervisor();
        let run = sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        let now = Utc::now();
        sup.complete(run.run_id, RunStatus::Completed, Some("the answer".to_string()), "cli", "c1", now)
            .await
            .unwrap();

        let mut sub = sup.outbound.subscribe("cli");
        let later = now + DEFAULT_RETRY_INTERVAL + chrono::Duration::seconds(1);
        let delivered = sup.retry_announcements(later).await.unwrap();
        assert_eq!(delivered, 1);

        let msg = sub.recv().await.unwrap();
        assert!(msg.content.contains("Status: completed"));
        assert!(msg.content.contains("Result: the answer"));

        let updated = sup.runs.get(run.run_id).await.unwrap().unwrap();
        assert!(updated.announced);
    }

    #[test]
    fn tool_policy_denies_by_glob_and_depth() {
        let policy = SubagentToolPolicy::new(&[], &["exec".to_string()], &[]);
        assert_eq!(policy.check_tool("exec", 1, 3), Some(reasons::TOOL_DENIED_BY_POLICY));
        assert_eq!(policy.check_tool("sessions_spawn", 3, 3), Some(reasons::SPAWN_DEPTH_LIMIT));
        assert_eq!(policy.check_tool("read_file", 1, 3), None);
    }

    #[test]
    fn tool_policy_allow_list_restricts_when_non_empty() {
        let policy = SubagentToolPolicy::new(&["read_*".to_string()], &[], &[]);
        assert_eq!(policy.check_tool("read_file", 0, 3), None);
        assert_eq!(policy.check_tool("exec", 0, 3), Some(reasons::TOOL_DENIED_BY_POLICY));
    }

    #[test]
    fn announce_target_falls_back_through_order() {
        let mut run = SubagentRun {
            run_id: RunId::new(),
            parent_session: "cli:c1".to_string(),
            root_session: "cli:root".to_string(),
            requester_channel: String::new(),
            requester_chat_id: String::new(),
            requester_trace: TraceId::new(),
            task: "t".to_string(),
            label: "l".to_string(),
            depth: 1,
            cleanup: CleanupPolicy::Keep,
            status: RunStatus::Completed,
            completion_output: None,
            announce_id: "a1".to_string(),
            next_announce_at: None,
            announced: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(
            resolve_announce_target(&run, "fallback", "fallback-chat"),
            ("cli".to_string(), "c1".to_string())
        );

        run.parent_session = String::new();
        assert_eq!(
            resolve_announce_target(&run, "fallback", "fallback-chat"),
            ("cli".to_string(), "root".to_string())
        );

        run.root_session = String::new();
        assert_eq!(
            resolve_announce_target(&run, "fallback", "fallback-chat"),
            ("fallback".to_string(), "fallback-chat".to_string())
        );
    }

    #[tokio::test]
    async fn spawn_notifies_launch_receiver() {
        let sup = supervisor();
        let mut rx = sup.take_launch_receiver().await.unwrap();
        let run = sup.spawn(spawn_req(0), Utc::now()).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received, run.run_id);
    }

    #[test]
    fn announce_skip_sentinel_is_recognized() {
        assert!(is_announce_skip("ANNOUNCE_SKIP"));
        assert!(is_announce_skip("  ANNOUNCE_SKIP  "));
        assert!(!is_announce_skip("Status: completed"));
    }
}
