//! Auto-indexer (spec §4.6 step 7/8: "enqueue a substantial result (≥200
//! chars) into the auto-indexer" and "enqueue conversation pair for
//! auto-indexing"). Indexing writes into [`MemoryStore`] under the
//! `tool:`/`conversation:` source prefixes [`kafclaw_memory::retention`]
//! already assigns TTLs to.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_memory::MemoryStore;

use crate::error::RuntimeResult;

/// Minimum tool-result length to index (spec §4.6 step 7).
pub const SUBSTANTIAL_RESULT_CHARS: usize = 200;

/// Indexes tool results and conversation turn pairs into a [`MemoryStore`].
pub struct AutoIndexer {
    memory: Arc<MemoryStore>,
}

impl AutoIndexer {
    #[must_use]
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }

    /// Index a tool result, if it meets the substantial-length threshold.
    /// No-op (returns `Ok(None)`) below the threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read or write.
    pub async fn index_tool_result(
        &self,
        trace_id_suffix: &str,
        tool_name: &str,
        result: &str,
        now: DateTime<Utc>,
    ) -> RuntimeResult<Option<()>> {
        if result.chars().count() < SUBSTANTIAL_RESULT_CHARS {
            return Ok(None);
        }
        let source = format!("tool:{trace_id_suffix}:{tool_name}");
        self.memory
            .upsert(&source, result, vec![tool_name.to_string()], now)
            .await?;
        Ok(Some(()))
    }

    /// Index one user/assistant conversation pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read or write.
    pub async fn index_conversation_pair(
        &self,
        session_key: &str,
        turn_index: u64,
        user_text: &str,
        assistant_text: &str,
        now: DateTime<Utc>,
    ) -> RuntimeResult<()> {
        let source = format!("conversation:{session_key}:{turn_index}");
        let content = format!("User: {user_text}\nAssistant: {assistant_text}");
        self.memory.upsert(&source, &content, vec![], now).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;

    fn indexer() -> AutoIndexer {
        AutoIndexer::new(Arc::new(MemoryStore::new(Arc::new(MemoryKvStore::new()))))
    }

    #[tokio::test]
    async fn short_tool_result_is_not_indexed() {
        let idx = indexer();
        let result = idx
            .index_tool_result("t1", "read_file", "short", Utc::now())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn substantial_tool_result_is_indexed() {
        let idx = indexer();
        let big = "x".repeat(SUBSTANTIAL_RESULT_CHARS);
        let result = idx
            .index_tool_result("t1", "read_file", &big, Utc::now())
            .await
            .unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn conversation_pair_is_indexed() {
        let idx = indexer();
        idx.index_conversation_pair("cli:c1", 1, "hi", "hello there", Utc::now())
            .await
            .unwrap();
    }
}
