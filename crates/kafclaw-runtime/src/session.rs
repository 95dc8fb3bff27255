//! C2 Session Store (spec §3: per-`SessionKey` turn history, last 50
//! messages retained, saved atomically at the end of each turn).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_core::SessionKey;
use kafclaw_llm::{Message, MessageRole};
use kafclaw_storage::{KvStore, ScopedKvStore};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeResult;

const NAMESPACE: &str = "sessions";

/// Turn history kept per [`SessionKey`] is capped here (spec §4.6: "last
/// 50 turns"); older entries are dropped from the front on save.
pub const MAX_HISTORY_MESSAGES: usize = 50;

/// One stored turn message, shaped for round-tripping through
/// [`kafclaw_llm::Message`] without re-deriving serde on the LLM types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: MessageRole,
    pub text: String,
}

impl StoredMessage {
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        Self {
            role: message.role,
            text: message.text().map(str::to_string).unwrap_or_default(),
        }
    }
}

/// Persisted conversation state for one [`SessionKey`] (spec §3
/// `Session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub history: Vec<StoredMessage>,
    pub last_active_at: DateTime<Utc>,
    /// Free-form metadata carried across turns (e.g. the last Day2Day
    /// capture mode, sub-agent parentage). Kept as a flat map rather than
    /// named fields so new ambient state doesn't require a migration.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    #[must_use]
    pub fn new(key: &SessionKey, now: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            history: Vec::new(),
            last_active_at: now,
            metadata: serde_json::Map::new(),
        }
    }

    /// Append a turn message and trim the history to
    /// [`MAX_HISTORY_MESSAGES`], keeping the most recent entries.
    pub fn push(&mut self, message: StoredMessage, now: DateTime<Utc>) {
        self.history.push(message);
        if self.history.len() > MAX_HISTORY_MESSAGES {
            let overflow = self.history.len() - MAX_HISTORY_MESSAGES;
            self.history.drain(0..overflow);
        }
        self.last_active_at = now;
    }
}

/// Persists [`Session`]s keyed by [`SessionKey`].
pub struct SessionStore {
    kv: ScopedKvStore,
}

impl SessionStore {
    #[must_use]
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            kv: ScopedKvStore::new(backend, NAMESPACE),
        }
    }

    /// Load a session, or `None` if this key has never been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn load(&self, key: &SessionKey) -> RuntimeResult<Option<Session>> {
        match self.kv.get(&key.to_string()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load a session, creating a fresh one in memory (not yet persisted)
    /// if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to read.
    pub async fn load_or_new(&self, key: &SessionKey, now: DateTime<Utc>) -> RuntimeResult<Session> {
        Ok(self.load(key).await?.unwrap_or_else(|| Session::new(key, now)))
    }

    /// Persist the session's current state. The whole row is overwritten,
    /// matching spec §4.6's "saved atomically at the end of each turn".
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to write.
    pub async fn save(&self, session: &Session) -> RuntimeResult<()> {
        let bytes = serde_json::to_vec(session)?;
        self.kv.set(&session.key, bytes).await?;
        Ok(())
    }

    /// Delete a session entirely (sub-agent cleanup with `delete` policy).
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails to delete.
    pub async fn delete(&self, key: &SessionKey) -> RuntimeResult<()> {
        self.kv.delete(&key.to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kafclaw_storage::MemoryKvStore;

    #[tokio::test]
    async fn load_or_new_creates_empty_session() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let key = SessionKey::new("cli", "c1");
        let session = store.load_or_new(&key, Utc::now()).await.unwrap();
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let key = SessionKey::new("cli", "c1");
        let now = Utc::now();
        let mut session = store.load_or_new(&key, now).await.unwrap();
        session.push(
            StoredMessage {
                role: MessageRole::User,
                text: "hi".to_string(),
            },
            now,
        );
        store.save(&session).await.unwrap();

        let loaded = store.load(&key).await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].text, "hi");
    }

    #[tokio::test]
    async fn history_is_capped_to_max_messages() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let key = SessionKey::new("cli", "c1");
        let now = Utc::now();
        let mut session = store.load_or_new(&key, now).await.unwrap();
        for i in 0..(MAX_HISTORY_MESSAGES + 10) {
            session.push(
                StoredMessage {
                    role: MessageRole::User,
                    text: format!("turn {i}"),
                },
                now,
            );
        }
        assert_eq!(session.history.len(), MAX_HISTORY_MESSAGES);
        assert_eq!(session.history[0].text, "turn 10");
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = SessionStore::new(Arc::new(MemoryKvStore::new()));
        let key = SessionKey::new("cli", "c1");
        let now = Utc::now();
        let session = store.load_or_new(&key, now).await.unwrap();
        store.save(&session).await.unwrap();
        store.delete(&key).await.unwrap();
        assert!(store.load(&key).await.unwrap().is_none());
    }
}
