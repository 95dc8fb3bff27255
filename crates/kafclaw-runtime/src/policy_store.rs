//! `PolicyDecision` persistence (spec §8 invariant: "a `PolicyDecision`
//! row exists with the same `(traceID, tool)` before any execution or
//! approval prompt").

use std::sync::Arc;

use kafclaw_core::TraceId;
use kafclaw_policy::PolicyDecision;
use kafclaw_storage::{KvStore, ScopedKvStore};

use crate::error::RuntimeResult;

const NAMESPACE: &str = "policy_decisions";

/// Persists [`PolicyDecision`] rows keyed by `(trace_id, tool)`.
pub struct PolicyDecisionStore {
    kv: ScopedKvStore,
}

impl PolicyDecisionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    fn key(trace_id: TraceId, tool: &str) -> String {
        format!("{trace_id}:{tool}")
    }

    /// Record a decision, overwriting any prior row for the same
    /// `(trace_id, tool)` — an approval response re-evaluates and
    /// re-records rather than appending a second row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to write.
    pub async fn record(&self, decision: &PolicyDecision) -> RuntimeResult<()> {
        let key = Self::key(decision.trace_id, &decision.tool);
        let bytes = serde_json::to_vec(decision)?;
        self.kv.set(&key, bytes).await?;
        Ok(())
    }

    /// Fetch the decision recorded for `(trace_id, tool)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn get(&self, trace_id: TraceId, tool: &str) -> RuntimeResult<Option<PolicyDecision>> {
        match self.kv.get(&Self::key(trace_id, tool)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List every decision recorded for a trace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list_for_trace(&self, trace_id: TraceId) -> RuntimeResult<Vec<PolicyDecision>> {
        let prefix = format!("{trace_id}:");
        let keys = self.kv.list_keys().await?;
        let mut decisions = Vec::new();
        for key in keys {
            if !key.starts_with(&prefix) {
                continue;
            }
            if let Some(bytes) = self.kv.get(&key).await? {
                decisions.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(decisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_core::{MessageType, TaskId, Tier};
    use kafclaw_policy::{Decision, PolicyContext};
    use kafclaw_storage::MemoryKvStore;
    use serde_json::json;

    fn ctx(trace_id: TraceId, tool: &str) -> PolicyContext {
        PolicyContext {
            sender: "owner".to_string(),
            channel: "cli".to_string(),
            tool: tool.to_string(),
            tier: Tier::Read,
            args: json!({}),
            trace_id,
            task_id: TaskId::new(),
            message_type: MessageType::Internal,
        }
    }

    #[tokio::test]
    async fn record_then_get_round_trips() {
        let store = PolicyDecisionStore::new(Arc::new(MemoryKvStore::new()));
        let trace = TraceId::new();
        let decision = PolicyDecision::from_context(&ctx(trace, "read_file"), &Decision::allow());
        store.record(&decision).await.unwrap();

        let fetched = store.get(trace, "read_file").await.unwrap().unwrap();
        assert!(fetched.allowed);
    }

    #[tokio::test]
    async fn list_for_trace_only_returns_matching_rows() {
        let store = PolicyDecisionStore::new(Arc::new(MemoryKvStore::new()));
        let trace = TraceId::new();
        store
            .record(&PolicyDecision::from_context(&ctx(trace, "read_file"), &Decision::allow()))
            .await
            .unwrap();
        store
            .record(&PolicyDecision::from_context(&ctx(trace, "exec"), &Decision::deny("sender_denied")))
            .await
            .unwrap();
        store
            .record(&PolicyDecision::from_context(
                &ctx(TraceId::new(), "read_file"),
                &Decision::allow(),
            ))
            .await
            .unwrap();

        let decisions = store.list_for_trace(trace).await.unwrap();
        assert_eq!(decisions.len(), 2);
    }

    #[tokio::test]
    async fn re_recording_overwrites_prior_row() {
        let store = PolicyDecisionStore::new(Arc::new(MemoryKvStore::new()));
        let trace = TraceId::new();
        store
            .record(&PolicyDecision::from_context(
                &ctx(trace, "exec"),
                &Decision::requires_approval("requires_approval"),
            ))
            .await
            .unwrap();
        store
            .record(&PolicyDecision::from_context(&ctx(trace, "exec"), &Decision::allow()))
            .await
            .unwrap();

        let decisions = store.list_for_trace(trace).await.unwrap();
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].allowed);
    }
}
