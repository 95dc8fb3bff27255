//! `MemoryStore` — chunk persistence, retention sweep, and cap enforcement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_storage::{KvStore, ScopedKvStore};

use crate::chunk::MemoryChunk;
use crate::error::{MemoryError, MemoryResult};
use crate::retention::{classify, Retention};

const NAMESPACE: &str = "memory_chunks";

/// Default hard cap on total stored chunks (spec §3: "default 50k").
pub const DEFAULT_MAX_CHUNKS: usize = 50_000;

/// Persists [`MemoryChunk`]s keyed by `source`, on top of [`KvStore`].
pub struct MemoryStore {
    kv: ScopedKvStore,
}

impl MemoryStore {
    /// Build a store over an existing [`KvStore`] backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    /// Store `content` under `source`.
    ///
    /// A no-op (returns the unchanged existing chunk) if `(source,
    /// content)` is identical to what's already stored; otherwise bumps
    /// `version` and recomputes `id` (spec §3).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read or write.
    pub async fn upsert(
        &self,
        source: &str,
        content: &str,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> MemoryResult<MemoryChunk> {
        if let Some(existing) = self.get(source).await? {
            let new_id = MemoryChunk::compute_id(source, content);
            if new_id == existing.id {
                return Ok(existing);
            }
            let updated = MemoryChunk {
                id: new_id,
                content: content.to_string(),
                tags,
                version: existing.version + 1,
                updated_at: now,
                ..existing
            };
            self.put(&updated).await?;
            return Ok(updated);
        }

        let chunk = MemoryChunk::new(source, content, tags, now);
        self.put(&chunk).await?;
        Ok(chunk)
    }

    /// Fetch the chunk stored under `source`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn get(&self, source: &str) -> MemoryResult<Option<MemoryChunk>> {
        match self.kv.get(source).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete the chunk stored under `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to delete.
    pub async fn delete(&self, source: &str) -> MemoryResult<()> {
        Ok(self.kv.delete(source).await?)
    }

    /// List every stored chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate or read.
    pub async fn list_all(&self) -> MemoryResult<Vec<MemoryChunk>> {
        let keys = self.kv.list_keys().await?;
        let mut chunks = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(chunk) = self.get(&key).await? {
                chunks.push(chunk);
            }
        }
        Ok(chunks)
    }

    /// Delete every chunk whose retention TTL has elapsed as of `now`.
    /// Permanent-prefixed chunks are never touched. Returns the number of
    /// chunks removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate, read, or
    /// delete.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> MemoryResult<usize> {
        let chunks = self.list_all().await?;
        let mut removed = 0;
        for chunk in chunks {
            if let Retention::Ttl(ttl) = classify(&chunk.source) {
                if now - chunk.updated_at > ttl {
                    self.delete(&chunk.source).await?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Enforce `max_chunks` by deleting the oldest non-permanent chunks
    /// (by `created_at`) until the total count is at or below the cap.
    /// Permanent chunks are never counted against the cap for deletion
    /// purposes, but they do count toward the total (spec §8: "total
    /// chunk count ≤ maxChunks" after a prune pass).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to enumerate, read, or
    /// delete.
    pub async fn enforce_cap(&self, max_chunks: usize) -> MemoryResult<usize> {
        let chunks = self.list_all().await?;
        if chunks.len() <= max_chunks {
            return Ok(0);
        }

        let mut prunable: Vec<&MemoryChunk> = chunks
            .iter()
            .filter(|c| classify(&c.source) != Retention::Permanent)
            .collect();
        prunable.sort_by_key(|c| c.created_at);

        let mut to_remove = chunks.len().saturating_sub(max_chunks);
        let mut removed = 0;
        let mut sources_to_delete = Vec::new();
        for chunk in prunable {
            if to_remove == 0 {
                break;
            }
            sources_to_delete.push(chunk.source.clone());
            to_remove -= 1;
        }
        for source in sources_to_delete {
            self.delete(&source).await?;
            removed += 1;
        }
        Ok(removed)
    }

    async fn put(&self, chunk: &MemoryChunk) -> MemoryResult<()> {
        let bytes = serde_json::to_vec(chunk).map_err(MemoryError::Serialization)?;
        self.kv.set(&chunk.source, bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn upsert_identical_content_is_noop() {
        let store = store();
        let now = Utc::now();
        let first = store
            .upsert("conversation:abc", "hello", vec![], now)
            .await
            .unwrap();
        let second = store
            .upsert("conversation:abc", "hello", vec![], now)
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.version, 1);
    }

    #[tokio::test]
    async fn upsert_changed_content_bumps_version() {
        let store = store();
        let now = Utc::now();
        store
            .upsert("conversation:abc", "hello", vec![], now)
            .await
            .unwrap();
        let updated = store
            .upsert("conversation:abc", "hello again", vec![], now)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "hello again");
    }

    #[tokio::test]
    async fn sweep_expired_removes_only_ttl_chunks_past_age() {
        let store = store();
        let old = Utc::now() - chrono::Duration::days(31);
        let fresh = Utc::now();
        store
            .upsert("conversation:old", "stale", vec![], old)
            .await
            .unwrap();
        store
            .upsert("conversation:fresh", "new", vec![], fresh)
            .await
            .unwrap();
        store.upsert("soul:identity", "never expires", vec![], old).await.unwrap();

        let removed = store.sweep_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("conversation:old").await.unwrap().is_none());
        assert!(store.get("conversation:fresh").await.unwrap().is_some());
        assert!(store.get("soul:identity").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn enforce_cap_prunes_oldest_non_permanent_first() {
        let store = store();
        let base = Utc::now() - chrono::Duration::days(10);
        for i in 0..5 {
            let ts = base + chrono::Duration::days(i);
            store
                .upsert(&format!("conversation:{i}"), "x", vec![], ts)
                .await
                .unwrap();
        }
        store.upsert("soul:identity", "permanent", vec![], base).await.unwrap();

        let removed = store.enforce_cap(3).await.unwrap();
        assert_eq!(removed, 3);
        assert!(store.get("conversation:0").await.unwrap().is_none());
        assert!(store.get("conversation:1").await.unwrap().is_none());
        assert!(store.get("conversation:2").await.unwrap().is_none());
        assert!(store.get("conversation:3").await.unwrap().is_some());
        assert!(store.get("soul:identity").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn enforce_cap_is_noop_under_limit() {
        let store = store();
        store.upsert("conversation:a", "x", vec![], Utc::now()).await.unwrap();
        let removed = store.enforce_cap(DEFAULT_MAX_CHUNKS).await.unwrap();
        assert_eq!(removed, 0);
    }
}
