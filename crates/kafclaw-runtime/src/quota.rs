//! Daily token quota enforcement (spec §4.6 step 7: "Check daily token
//! quota (sum of token usage on tasks with `createdAt` in current day
//! UTC). If exceeded, short-circuit with a fixed quota-exceeded
//! response.").

use chrono::{DateTime, Utc};

use crate::error::RuntimeResult;
use crate::task::TaskStore;

/// Fallback daily token limit when the settings layer has nothing
/// configured for `daily_token_limit` (spec §6: "all optional; malformed
/// values fall back to defaults").
pub const DEFAULT_DAILY_TOKEN_LIMIT: u64 = 200_000;

/// Fixed, user-facing reply for a quota-exceeded turn (spec §7
/// `QuotaExceeded`: "short-circuits the loop with a fixed user-facing
/// message; task marked completed with that content").
pub const QUOTA_EXCEEDED_MESSAGE: &str =
    "I've reached today's usage limit for this agent. Please try again tomorrow.";

/// Returns `true` if today's token usage already meets or exceeds
/// `limit`.
///
/// # Errors
///
/// Returns an error if the task store fails to enumerate or read.
pub async fn is_exceeded(tasks: &TaskStore, now: DateTime<Utc>, limit: u64) -> RuntimeResult<bool> {
    let used = tasks.tokens_used_on(now.date_naive()).await?;
    Ok(used >= limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_core::{MessageType, TraceId};
    use kafclaw_storage::MemoryKvStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn not_exceeded_below_limit() {
        let store = TaskStore::new(Arc::new(MemoryKvStore::new()));
        let now = Utc::now();
        let mut task = crate::task::AgentTask::new(
            TraceId::new(),
            "k1",
            "cli",
            "c1",
            "owner",
            MessageType::Internal,
            "hi",
            now,
        );
        task.record_tokens(100, 50);
        store.insert(task).await.unwrap();

        assert!(!is_exceeded(&store, now, 1000).await.unwrap());
    }

    #[tokio::test]
    async fn exceeded_at_or_above_limit() {
        let store = TaskStore::new(Arc::new(MemoryKvStore::new()));
        let now = Utc::now();
        let mut task = crate::task::AgentTask::new(
            TraceId::new(),
            "k1",
            "cli",
            "c1",
            "owner",
            MessageType::Internal,
            "hi",
            now,
        );
        task.record_tokens(800, 200);
        store.insert(task).await.unwrap();

        assert!(is_exceeded(&store, now, 1000).await.unwrap());
    }
}
