//! `AgentTask` persistence (spec §3, §6: "keyed by a generated `taskID`
//! and indexed uniquely by `idempotencyKey`").

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_core::{MessageType, TaskId, TraceId};
use kafclaw_storage::{KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeError, RuntimeResult};

const TASKS_NAMESPACE: &str = "tasks";
const IDEMPOTENCY_NAMESPACE: &str = "task_idempotency";

/// Lifecycle status of an [`AgentTask`] (spec §3: monotonic `pending <
/// processing < {completed, failed}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not yet picked up by the loop.
    Pending,
    /// Currently running through the think↔act cycle.
    Processing,
    /// Terminated with a response.
    Completed,
    /// Terminated with an error.
    Failed,
}

/// Delivery status of a completed task (spec §3: monotonic `pending <
/// sent ≤ failed`; `sent → failed` is allowed on a subscriber-reported
/// failure, which is why this is not folded into [`TaskStatus`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Not yet attempted, or awaiting its next retry.
    Pending,
    /// Published to the outbound bus.
    Sent,
    /// Retry budget exhausted without a successful publish.
    Failed,
}

/// A persisted unit of work for one inbound message (spec §3 `AgentTask`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTask {
    /// Unique task id.
    pub id: TaskId,
    /// Trace this task belongs to.
    pub trace_id: TraceId,
    /// Dedup key from the originating [`kafclaw_core::InboundMessage`].
    pub idempotency_key: String,
    /// Originating channel.
    pub channel: String,
    /// Originating chat id.
    pub chat_id: String,
    /// Originating sender id.
    pub sender_id: String,
    /// Trust class of the originating message.
    pub message_type: MessageType,
    /// Raw inbound content.
    pub content_in: String,
    /// Final response content, once terminal.
    pub content_out: Option<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Current delivery status.
    pub delivery_status: DeliveryStatus,
    /// Delivery attempts made so far.
    pub delivery_attempts: u32,
    /// When the next delivery retry is eligible, if any.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Prompt tokens consumed across this task's LLM calls.
    pub prompt_tokens: u64,
    /// Completion tokens consumed across this task's LLM calls.
    pub completion_tokens: u64,
    /// Total tokens consumed (prompt + completion).
    pub total_tokens: u64,
    /// Error text, if the task failed.
    pub error: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task last transitioned status.
    pub updated_at: DateTime<Utc>,
}

impl AgentTask {
    /// Build a new `pending` task for a freshly admitted inbound message.
    #[must_use]
    pub fn new(
        trace_id: TraceId,
        idempotency_key: impl Into<String>,
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_type: MessageType,
        content_in: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            trace_id,
            idempotency_key: idempotency_key.into(),
            channel: channel.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            message_type,
            content_in: content_in.into(),
            content_out: None,
            status: TaskStatus::Pending,
            delivery_status: DeliveryStatus::Pending,
            delivery_attempts: 0,
            next_retry_at: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add token usage from one LLM call to the task's running totals.
    pub fn record_tokens(&mut self, prompt: u64, completion: u64) {
        self.prompt_tokens += prompt;
        self.completion_tokens += completion;
        self.total_tokens += prompt + completion;
    }
}

/// Persists [`AgentTask`]s keyed by [`TaskId`], with a secondary unique
/// index on `idempotency_key` (spec §6: "concurrent inserts with the same
/// key are disallowed; callers treat a conflict as a dedup hit").
pub struct TaskStore {
    tasks: ScopedKvStore,
    idempotency_index: ScopedKvStore,
}

impl TaskStore {
    /// Build a store over an existing [`KvStore`] backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            tasks: ScopedKvStore::new(backend.clone(), TASKS_NAMESPACE),
            idempotency_index: ScopedKvStore::new(backend, IDEMPOTENCY_NAMESPACE),
        }
    }

    /// Look up a task by its idempotency key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn find_by_idempotency_key(&self, key: &str) -> RuntimeResult<Option<AgentTask>> {
        match self.idempotency_index.get(key).await? {
            Some(bytes) => {
                let id: TaskId = serde_json::from_slice(&bytes)?;
                self.get(id).await
            }
            None => Ok(None),
        }
    }

    /// Insert a new task and its idempotency index entry.
    ///
    /// Returns [`RuntimeError::DuplicateTask`] if `idempotency_key` is
    /// already indexed — the caller should treat this as a dedup hit, not
    /// a failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read or write.
    pub async fn insert(&self, task: AgentTask) -> RuntimeResult<AgentTask> {
        if self
            .idempotency_index
            .get(&task.idempotency_key)
            .await?
            .is_some()
        {
            return Err(RuntimeError::DuplicateTask(task.id));
        }
        let id_bytes = serde_json::to_vec(&task.id)?;
        self.idempotency_index
            .set(&task.idempotency_key, id_bytes)
            .await?;
        self.put(&task).await?;
        Ok(task)
    }

    /// Fetch a task by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn get(&self, id: TaskId) -> RuntimeResult<Option<AgentTask>> {
        match self.tasks.get(&id.to_string()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persist a task's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to write.
    pub async fn put(&self, task: &AgentTask) -> RuntimeResult<()> {
        let bytes = serde_json::to_vec(task)?;
        self.tasks.set(&task.id.to_string(), bytes).await?;
        Ok(())
    }

    /// List every persisted task. Used for the daily token quota sum and
    /// delivery polling; both are small-scale enough in this workspace's
    /// single-process model to afford a full scan rather than a
    /// secondary date index.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list_all(&self) -> RuntimeResult<Vec<AgentTask>> {
        let keys = self.tasks.list_keys().await?;
        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.tasks.get(&key).await? {
                tasks.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(tasks)
    }

    /// Sum of `total_tokens` across every task created on `day` (UTC date
    /// match), for the daily token quota check (spec §4.6 step 7).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn tokens_used_on(&self, day: chrono::NaiveDate) -> RuntimeResult<u64> {
        let tasks = self.list_all().await?;
        Ok(tasks
            .iter()
            .filter(|t| t.created_at.date_naive() == day)
            .map(|t| t.total_tokens)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;

    fn store() -> TaskStore {
        TaskStore::new(Arc::new(MemoryKvStore::new()))
    }

    fn sample_task(key: &str, now: DateTime<Utc>) -> AgentTask {
        AgentTask::new(
            TraceId::new(),
            key,
            "cli",
            "c1",
            "owner",
            MessageType::Internal,
            "hello",
            now,
        )
    }

    #[tokio::test]
    async fn insert_then_find_by_idempotency_key() {
        let store = store();
        let now = Utc::now();
        let task = store.insert(sample_task("wa:1", now)).await.unwrap();
        let found = store.find_by_idempotency_key("wa:1").await.unwrap().unwrap();
        assert_eq!(found.id, task.id);
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_rejected() {
        let store = store();
        let now = Utc::now();
        store.insert(sample_task("wa:1", now)).await.unwrap();
        let err = store.insert(sample_task("wa:1", now)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::DuplicateTask(_)));
    }

    #[tokio::test]
    async fn tokens_used_on_sums_same_day_tasks() {
        let store = store();
        let day1 = DateTime::parse_from_rfc3339("2026-07-29T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let day2 = DateTime::parse_from_rfc3339("2026-07-30T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut t1 = sample_task("wa:1", day1);
        t1.record_tokens(100, 50);
        store.insert(t1).await.unwrap();

        let mut t2 = sample_task("wa:2", day1);
        t2.record_tokens(10, 10);
        store.insert(t2).await.unwrap();

        let mut t3 = sample_task("wa:3", day2);
        t3.record_tokens(1000, 1000);
        store.insert(t3).await.unwrap();

        let used = store.tokens_used_on(day1.date_naive()).await.unwrap();
        assert_eq!(used, 170);
    }
}
