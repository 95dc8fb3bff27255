//! `MemoryChunk` — spec §3.

use chrono::{DateTime, Utc};
use kafclaw_crypto::ContentHash;
use serde::{Deserialize, Serialize};

/// A single stored memory chunk, addressed by its `source` key.
///
/// `id` is recomputed as `hash(source, content)` on every store — it is
/// *not* the store's primary key (`source` is); two stores of the same
/// `source` with different `content` therefore keep one row but get a new
/// `id` and a bumped `version` (spec §3: "changed content bumps version").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryChunk {
    /// `hash(source, content)`, recomputed whenever content changes.
    pub id: ContentHash,
    /// The chunk's text.
    pub content: String,
    /// Stable identity key this chunk is stored under (also its retention
    /// class: the prefix before the first `:`, or the whole string).
    pub source: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Optional embedding vector, for future vector-search recall.
    pub embedding: Option<Vec<f32>>,
    /// Bumped each time `content` changes under the same `source`.
    pub version: u32,
    /// When this source was first stored.
    pub created_at: DateTime<Utc>,
    /// When `content` last changed.
    pub updated_at: DateTime<Utc>,
}

impl MemoryChunk {
    /// Compute the deterministic id for a `(source, content)` pair.
    #[must_use]
    pub fn compute_id(source: &str, content: &str) -> ContentHash {
        ContentHash::hash_multi(&[source.as_bytes(), content.as_bytes()])
    }

    /// Build a brand-new chunk, version 1.
    #[must_use]
    pub fn new(source: impl Into<String>, content: impl Into<String>, tags: Vec<String>, now: DateTime<Utc>) -> Self {
        let source = source.into();
        let content = content.into();
        let id = Self::compute_id(&source, &content);
        Self {
            id,
            content,
            source,
            tags,
            embedding: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_source_and_content_produce_identical_id() {
        let a = MemoryChunk::compute_id("user:alice", "likes rust");
        let b = MemoryChunk::compute_id("user:alice", "likes rust");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_produces_different_id() {
        let a = MemoryChunk::compute_id("user:alice", "likes rust");
        let b = MemoryChunk::compute_id("user:alice", "likes go");
        assert_ne!(a, b);
    }
}
