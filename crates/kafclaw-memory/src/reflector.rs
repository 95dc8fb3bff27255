//! Memory Reflector (spec §4.8, C9, second half): consolidates a session's
//! accumulated observations down to roughly 60% of their count once they
//! exceed a cap, without ever discarding a `high`-priority entry.
//!
//! Grounded on the same `TextCompressor` collaborator seam as the Observer
//! ([`crate::observation`]) — the Reflector is the same shape of
//! threshold-triggered batch pass, just consolidating observations instead
//! of raw turns, so it reuses the Observer's parsed-output format rather
//! than inventing a second one.

use chrono::{DateTime, Utc};

use crate::error::MemoryResult;
use crate::observation::{parse_observations, Observation, ObservationStore, Priority, TextCompressor};

/// Default total-observation count (per session) that triggers a reflection
/// pass (spec §4.8: "fires when total observations ≥ max").
pub const DEFAULT_MAX_OBSERVATIONS: usize = 500;

const REFLECTION_PROMPT: &str = "Consolidate the following observation notes into fewer, denser \
notes covering the same ground. Output only lines of the form `- [HIGH|MEDIUM|LOW] <1-2 \
sentences>` grouped under `## YYYY-MM-DD` headers. Do not introduce new facts.";

/// Runs the Reflector pass over a session's [`ObservationStore`] rows.
pub struct Reflector {
    max_observations: usize,
}

impl Reflector {
    /// Build a reflector using the default cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_observations(DEFAULT_MAX_OBSERVATIONS)
    }

    /// Build a reflector with an explicit cap.
    #[must_use]
    pub fn with_max_observations(max_observations: usize) -> Self {
        Self {
            max_observations: max_observations.max(1),
        }
    }

    /// Whether `session_observation_count` has crossed the cap and a
    /// reflection pass should run.
    #[must_use]
    pub fn should_reflect(&self, session_observation_count: usize) -> bool {
        session_observation_count >= self.max_observations
    }

    /// Consolidate `session_id`'s observations in `store`.
    ///
    /// All `high`-priority rows are carried over untouched; every other row
    /// is handed to `compressor` for consolidation, targeting roughly 60% of
    /// the original total row count (spec §4.8). Returns the new set of
    /// observations now on record for the session (empty if the session was
    /// under the cap and nothing was done).
    ///
    /// Deletion of the superseded rows happens only after the consolidated
    /// rows are computed and inserted, approximating spec §4.8's "deletes
    /// old observations in the same transaction" within this crate's
    /// single-process, non-transactional KV model — the same caveat
    /// documented on [`crate::observation::ObservationQueue::compress_and_advance`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read, write, or
    /// delete, or if `compressor` fails.
    pub async fn reflect_session(
        &self,
        session_id: &str,
        store: &ObservationStore,
        compressor: &dyn TextCompressor,
        now: DateTime<Utc>,
    ) -> MemoryResult<Vec<Observation>> {
        let all = store.list_all().await?;
        let session_entries: Vec<(String, Observation)> = all
            .into_iter()
            .filter(|(_, obs)| obs.session_id == session_id)
            .collect();

        if !self.should_reflect(session_entries.len()) {
            return Ok(Vec::new());
        }

        let original_count = session_entries.len();
        let target_total = ((original_count * 6) / 10).max(1);

        let (high, rest): (Vec<_>, Vec<_>) = session_entries
            .iter()
            .map(|(_, obs)| obs.clone())
            .partition(|obs| obs.priority == Priority::High);

        let consolidated_budget = target_total.saturating_sub(high.len());

        let mut new_observations = high;
        if consolidated_budget > 0 && !rest.is_empty() {
            let input = rest
                .iter()
                .map(|obs| format!("- [{:?}] {}", obs.priority, obs.content))
                .collect::<Vec<_>>()
                .join("\n");
            let raw = compressor.compress(REFLECTION_PROMPT, &input).await?;
            let mut consolidated = parse_observations(session_id, &raw, now);
            consolidated.truncate(consolidated_budget);
            new_observations.extend(consolidated);
        }

        for (key, _) in &session_entries {
            store.delete(key).await?;
        }
        store.insert_all(&new_observations).await?;

        Ok(new_observations)
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the Reflector's consolidated output the same way the Observer
/// parses compression output — re-exported under a Reflector-scoped name so
/// callers don't need to reach into [`crate::observation`] directly.
#[must_use]
pub fn parse_consolidated(session_id: &str, raw: &str, now: DateTime<Utc>) -> Vec<Observation> {
    parse_observations(session_id, raw, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationStore;
    use async_trait::async_trait;
    use kafclaw_storage::MemoryKvStore;
    use std::sync::Arc;

    struct FixedCompressor(String);

    #[async_trait]
    impl TextCompressor for FixedCompressor {
        async fn compress(&self, _prompt: &str, _input: &str) -> MemoryResult<String> {
            Ok(self.0.clone())
        }
    }

    fn observation(session: &str, priority: Priority, content: &str, now: DateTime<Utc>) -> Observation {
        Observation {
            session_id: session.to_string(),
            content: content.to_string(),
            priority,
            observed_at: now,
            referenced_at: None,
        }
    }

    #[tokio::test]
    async fn does_not_reflect_under_cap() {
        let backend = Arc::new(MemoryKvStore::new());
        let store = ObservationStore::new(backend);
        let now = Utc::now();
        store
            .insert_all(&[observation("s1", Priority::Medium, "one", now)])
            .await
            .unwrap();

        let reflector = Reflector::with_max_observations(10);
        let compressor = FixedCompressor(String::new());
        let result = reflector
            .reflect_session("s1", &store, &compressor, now)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(store.list_for_session("s1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn preserves_all_high_priority_entries() {
        let backend = Arc::new(MemoryKvStore::new());
        let store = ObservationStore::new(backend);
        let now = Utc::now();

        let mut rows = Vec::new();
        for i in 0..3 {
            rows.push(observation("s1", Priority::High, &format!("critical {i}"), now));
        }
        for i in 0..3 {
            rows.push(observation("s1", Priority::Low, &format!("noise {i}"), now));
        }
        store.insert_all(&rows).await.unwrap();

        let reflector = Reflector::with_max_observations(6);
        let compressor =
            FixedCompressor("## 2026-07-27\n- [LOW] consolidated noise".to_string());
        let result = reflector
            .reflect_session("s1", &store, &compressor, now)
            .await
            .unwrap();

        let high_survivors = result.iter().filter(|o| o.priority == Priority::High).count();
        assert_eq!(high_survivors, 3);

        let stored = store.list_for_session("s1").await.unwrap();
        assert_eq!(stored.iter().filter(|o| o.priority == Priority::High).count(), 3);
    }

    #[tokio::test]
    async fn consolidation_reduces_total_row_count() {
        let backend = Arc::new(MemoryKvStore::new());
        let store = ObservationStore::new(backend);
        let now = Utc::now();

        let rows: Vec<Observation> = (0..10)
            .map(|i| observation("s1", Priority::Medium, &format!("turn {i}"), now))
            .collect();
        store.insert_all(&rows).await.unwrap();

        let reflector = Reflector::with_max_observations(10);
        let compressor = FixedCompressor("## 2026-07-27\n- [MEDIUM] one dense note".to_string());
        let result = reflector
            .reflect_session("s1", &store, &compressor, now)
            .await
            .unwrap();

        assert!(result.len() < 10);
        assert_eq!(store.list_for_session("s1").await.unwrap().len(), result.len());
    }
}
