//! `ExpertiseTracker` — records skill events and maintains the aggregate
//! `ExpertiseRow` per skill (spec §4.9, C10).

use std::sync::Arc;

use kafclaw_storage::{KvStore, ScopedKvStore};

use crate::error::{ExpertiseError, ExpertiseResult};
use crate::types::{compute_trend, ExpertiseRow, SkillEvent};

const NAMESPACE: &str = "expertise";

/// Quality readings retained per skill for `avgQuality`/trend computation
/// (spec §3: "mean of last ≤50 quality readings").
const MAX_RECENT_QUALITIES: usize = 50;

/// Tracks per-skill `ExpertiseRow` aggregates on top of [`KvStore`].
pub struct ExpertiseTracker {
    kv: ScopedKvStore,
}

impl ExpertiseTracker {
    /// Build a tracker over an existing [`KvStore`] backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    /// Record `event`, upserting the skill's aggregate row.
    ///
    /// Success/failure counters, `avgQuality`, and `trend` are all
    /// recomputed from the same read-modify-write pass (spec §4.9: "writes
    /// a skill event and upserts the aggregate row in one transaction" —
    /// here, one KV get followed by one KV set).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read or write.
    pub async fn record_event(&self, event: SkillEvent) -> ExpertiseResult<ExpertiseRow> {
        let updated = match self.get(&event.skill_name).await? {
            None => ExpertiseRow::from_first_event(&event),
            Some(mut row) => {
                if event.action.is_success() {
                    row.success_count += 1;
                } else {
                    row.failure_count += 1;
                }
                row.last_used = event.recorded_at;
                row.total_duration_ms = row.total_duration_ms.saturating_add(event.duration_ms);

                row.recent_qualities.push(event.quality);
                if row.recent_qualities.len() > MAX_RECENT_QUALITIES {
                    let overflow = row.recent_qualities.len() - MAX_RECENT_QUALITIES;
                    row.recent_qualities.drain(0..overflow);
                }
                row.avg_quality =
                    row.recent_qualities.iter().sum::<f64>() / row.recent_qualities.len() as f64;
                row.trend = compute_trend(&row.recent_qualities);
                row
            }
        };

        self.put(&updated).await?;
        Ok(updated)
    }

    /// Fetch the aggregate row for `skill_name`, if any events have been
    /// recorded for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn get(&self, skill_name: &str) -> ExpertiseResult<Option<ExpertiseRow>> {
        match self.kv.get(skill_name).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List every tracked skill's aggregate row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list_all(&self) -> ExpertiseResult<Vec<ExpertiseRow>> {
        let keys = self.kv.list_keys().await?;
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = self.get(&key).await? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn put(&self, row: &ExpertiseRow) -> ExpertiseResult<()> {
        let bytes = serde_json::to_vec(row).map_err(ExpertiseError::Serialization)?;
        self.kv.set(&row.skill_name, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Action;
    use chrono::Utc;
    use kafclaw_storage::MemoryKvStore;

    fn tracker() -> ExpertiseTracker {
        ExpertiseTracker::new(Arc::new(MemoryKvStore::new()))
    }

    fn event(skill: &str, action: Action, quality: f64) -> SkillEvent {
        SkillEvent {
            skill_name: skill.to_string(),
            action,
            quality,
            duration_ms: 10,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn first_event_seeds_row() {
        let tracker = tracker();
        let row = tracker
            .record_event(event("filesystem", Action::ToolUsed, 0.9))
            .await
            .unwrap();
        assert_eq!(row.success_count, 1);
        assert_eq!(row.failure_count, 0);
        assert!((row.avg_quality - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn other_action_counts_as_failure() {
        let tracker = tracker();
        let row = tracker
            .record_event(event("filesystem", Action::Other, 0.2))
            .await
            .unwrap();
        assert_eq!(row.success_count, 0);
        assert_eq!(row.failure_count, 1);
    }

    #[tokio::test]
    async fn avg_quality_caps_at_fifty_recent_readings() {
        let tracker = tracker();
        for _ in 0..60 {
            tracker
                .record_event(event("shell", Action::ToolUsed, 1.0))
                .await
                .unwrap();
        }
        let row = tracker.get("shell").await.unwrap().unwrap();
        assert_eq!(row.recent_qualities.len(), 50);
        assert_eq!(row.success_count, 60);
    }

    #[tokio::test]
    async fn list_all_returns_every_tracked_skill() {
        let tracker = tracker();
        tracker
            .record_event(event("filesystem", Action::ToolUsed, 0.8))
            .await
            .unwrap();
        tracker
            .record_event(event("shell", Action::ToolUsed, 0.5))
            .await
            .unwrap();
        let rows = tracker.list_all().await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
