//! Raw key-value storage tier.
//!
//! Direct byte-level `get`/`set`/`delete`, namespaced so unrelated stores
//! (sessions, audit entries, memory chunks, scheduler state) never collide
//! in the same backing database.
//!
//! The teacher's `astrid-storage` crate documents this tier as backed by
//! `SurrealKV`, an embedded LSM-tree KV store; the exact `kv.rs` source
//! was not present in the retrieved pack, so [`SurrealKvStore`] here is
//! reconstructed from the crate's documented public API (`KvStore`,
//! `MemoryKvStore`, `ScopedKvStore`) against the confirmed `Database`
//! connection pattern in [`crate::db`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{StorageError, StorageResult};

/// A single stored key-value pair, with its namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    /// Namespace the key lives in.
    pub namespace: String,
    /// Key within the namespace.
    pub key: String,
    /// Raw stored bytes.
    pub value: Vec<u8>,
}

/// Namespaced byte-level key-value store.
///
/// Implementations must be thread-safe. Every method is namespaced: two
/// stores using the same backing database but different namespaces never
/// see each other's keys.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store a value by key, overwriting any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to write.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()>;

    /// List all keys in a namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to enumerate keys.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;
}

/// In-memory [`KvStore`], for tests and single-process dev use.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: std::sync::RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryKvStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::Internal("lock poisoned".to_string()))?;
        Ok(data.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Internal("lock poisoned".to_string()))?;
        data.insert((namespace.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Internal("lock poisoned".to_string()))?;
        data.remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::Internal("lock poisoned".to_string()))?;
        Ok(data
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, k)| k.clone())
            .collect())
    }
}

/// `SurrealDB`-backed [`KvStore`], for durable single-node deployments.
///
/// Stores each entry as a row in a single `kv_store` table, keyed by
/// `namespace:key`, mirroring the namespace-prefixed key scheme the audit
/// chain storage (`kafclaw-audit`) uses on top of this trait.
pub struct SurrealKvStore {
    db: Arc<Database>,
}

impl SurrealKvStore {
    /// Wrap an already-connected [`Database`].
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open (or create) a `SurrealDB`-backed store at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: &str) -> StorageResult<Self> {
        let db = Database::connect_embedded(path).await?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Open an in-memory `SurrealDB`-backed store (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory engine cannot be initialized.
    pub async fn in_memory() -> StorageResult<Self> {
        let db = Database::connect_memory().await?;
        Ok(Self::new(Arc::new(db)))
    }

    fn row_id(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KvRow {
    value: Vec<u8>,
}

#[async_trait]
impl KvStore for SurrealKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let row: Option<KvRow> = self
            .db
            .client()
            .select(("kv_store", Self::row_id(namespace, key)))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(row.map(|r| r.value))
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let _: Option<KvRow> = self
            .db
            .client()
            .upsert(("kv_store", Self::row_id(namespace, key)))
            .content(KvRow { value })
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<()> {
        let _: Option<KvRow> = self
            .db
            .client()
            .delete(("kv_store", Self::row_id(namespace, key)))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let prefix = format!("{namespace}:");
        let mut result = self
            .db
            .client()
            .query("SELECT id FROM kv_store WHERE string::starts_with(meta::id(id), $prefix)")
            .bind(("prefix", prefix.clone()))
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        let ids: Vec<surrealdb::RecordId> = result
            .take(0)
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                let id_str = id.to_string();
                id_str.strip_prefix(&prefix).map(str::to_string)
            })
            .collect())
    }
}

/// A [`KvStore`] view pre-scoped to a single namespace, so callers never
/// have to repeat it.
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl ScopedKvStore {
    /// Scope an existing store to a namespace.
    #[must_use]
    pub fn new(inner: Arc<dyn KvStore>, namespace: impl Into<String>) -> Self {
        Self {
            inner,
            namespace: namespace.into(),
        }
    }

    /// Fetch a value by key within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to read.
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(&self.namespace, key).await
    }

    /// Store a value by key within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to write.
    pub async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.inner.set(&self.namespace, key, value).await
    }

    /// Delete a key within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to delete.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.delete(&self.namespace, key).await
    }

    /// List all keys within this namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to enumerate keys.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }
}
