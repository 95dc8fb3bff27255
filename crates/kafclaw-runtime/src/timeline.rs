//! `TimelineEvent` persistence (spec §3: "append-only" spans recording
//! one LLM or TOOL step of a trace, plus `MEMORY_CONTEXT_OVERFLOW`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_core::TraceId;
use kafclaw_storage::{KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::RuntimeResult;

const NAMESPACE: &str = "timeline_events";

/// The stable classification strings spec §6 requires readers to accept.
pub mod classification {
    /// One LLM completion call.
    pub const LLM: &str = "LLM";
    /// One tool execution.
    pub const TOOL: &str = "TOOL";
    /// A context-builder section was clipped against the byte budget.
    pub const MEMORY_CONTEXT_OVERFLOW: &str = "MEMORY_CONTEXT_OVERFLOW";
}

/// One append-only span on a trace (spec §3 `TimelineEvent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Unique event id.
    pub event_id: Uuid,
    /// Trace this event belongs to.
    pub trace_id: TraceId,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Stable classification string (see [`classification`]).
    pub classification: String,
    /// Human-readable span text (truncated per spec §4.6: 10 KiB cap).
    pub content_text: String,
    /// Structured metadata specific to the classification.
    pub metadata: Value,
}

/// Bytes an event's `content_text` is capped at before persisting (spec
/// §4.6: "truncated system/last-user/response (10 KiB)").
pub const SPAN_TEXT_CAP_BYTES: usize = 10 * 1024;

impl TimelineEvent {
    /// Build a new event, truncating `content_text` to the span cap.
    #[must_use]
    pub fn new(
        trace_id: TraceId,
        classification: impl Into<String>,
        content_text: impl Into<String>,
        metadata: Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            trace_id,
            timestamp: now,
            classification: classification.into(),
            content_text: kafclaw_tools::truncate_for_log(&content_text.into()),
            metadata,
        }
    }
}

/// Persists [`TimelineEvent`]s, queryable by trace.
pub struct TimelineStore {
    kv: ScopedKvStore,
}

impl TimelineStore {
    /// Build a store over an existing [`KvStore`] backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    /// Append one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to write.
    pub async fn append(&self, event: TimelineEvent) -> RuntimeResult<()> {
        let key = format!("{}:{}", event.trace_id, event.event_id);
        let bytes = serde_json::to_vec(&event)?;
        self.kv.set(&key, bytes).await?;
        Ok(())
    }

    /// List every event recorded for `trace_id`, in no particular order
    /// (callers sort by `timestamp` if ordering matters).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list_for_trace(&self, trace_id: TraceId) -> RuntimeResult<Vec<TimelineEvent>> {
        let prefix = format!("{trace_id}:");
        let keys = self.kv.list_keys().await?;
        let mut events = Vec::new();
        for key in keys {
            if !key.starts_with(&prefix) {
                continue;
            }
            if let Some(bytes) = self.kv.get(&key).await? {
                events.push(serde_json::from_slice(&bytes)?);
            }
        }
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;
    use serde_json::json;

    #[tokio::test]
    async fn append_then_list_for_trace() {
        let store = TimelineStore::new(Arc::new(MemoryKvStore::new()));
        let trace = TraceId::new();
        let now = Utc::now();
        store
            .append(TimelineEvent::new(trace, classification::LLM, "call 1", json!({}), now))
            .await
            .unwrap();
        store
            .append(TimelineEvent::new(trace, classification::TOOL, "call 2", json!({}), now))
            .await
            .unwrap();
        store
            .append(TimelineEvent::new(TraceId::new(), classification::LLM, "other trace", json!({}), now))
            .await
            .unwrap();

        let events = store.list_for_trace(trace).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn content_text_is_truncated_to_span_cap() {
        let trace = TraceId::new();
        let big = "x".repeat(SPAN_TEXT_CAP_BYTES * 2);
        let event = TimelineEvent::new(trace, classification::LLM, big, json!({}), Utc::now());
        assert!(event.content_text.len() < SPAN_TEXT_CAP_BYTES * 2);
    }
}
