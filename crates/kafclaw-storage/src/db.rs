//! `SurrealDB` query engine connection.
//!
//! [`Database`] wraps a `SurrealDB` connection using the `any` engine so
//! the same type serves both the embedded (`SurrealKV`-backed) and
//! in-memory (test) cases.
//!
//! # Connection strings
//!
//! | Mode | Connection |
//! |------|-----------|
//! | Embedded | `surrealkv://path/to/data` |
//! | In-memory (tests) | `mem://` |

use crate::error::{StorageError, StorageResult};

/// Re-export `SurrealDB` for direct query access when the typed API is
/// not sufficient.
pub use surrealdb;

/// `SurrealDB` connection wrapper used by every typed store in this
/// workspace (sessions, memory chunks, scheduler state, settings).
pub struct Database {
    inner: surrealdb::Surreal<surrealdb::engine::any::Any>,
}

impl Database {
    /// Connect to an embedded `SurrealDB` instance, persisting to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the connection fails.
    pub async fn connect_embedded(path: &str) -> StorageResult<Self> {
        let endpoint = format!("surrealkv://{path}");
        let db: surrealdb::Surreal<surrealdb::engine::any::Any> = surrealdb::Surreal::init();
        db.connect(&endpoint)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        db.use_ns("kafclaw")
            .use_db("main")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { inner: db })
    }

    /// Connect to an in-memory `SurrealDB` instance (tests only).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Connection`] if the connection fails.
    pub async fn connect_memory() -> StorageResult<Self> {
        let db: surrealdb::Surreal<surrealdb::engine::any::Any> = surrealdb::Surreal::init();
        db.connect("mem://")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        db.use_ns("kafclaw")
            .use_db("test")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(Self { inner: db })
    }

    /// Direct access to the underlying client for queries the typed API
    /// does not cover.
    #[must_use]
    pub fn client(&self) -> &surrealdb::Surreal<surrealdb::engine::any::Any> {
        &self.inner
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
