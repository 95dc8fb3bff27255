//! KafClaw Storage — unified key-value persistence layer.
//!
//! The metadata store behind tasks, timeline events, policy decisions, and
//! settings (spec §3, §6) is an external collaborator seen only through
//! typed operations; this crate is the thin KV tier those typed stores
//! (in `kafclaw-runtime`, `kafclaw-policy`, `kafclaw-memory`) are built on,
//! mirroring the teacher's two-tier storage split (`KvStore` for raw
//! bytes, `Database` for the query engine). Every higher-level store in
//! this workspace is namespace-scoped bytes on top of [`KvStore`] rather
//! than bespoke SQL, following the audit chain's own storage pattern.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod db;
pub mod error;
pub mod kv;

pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use kv::{KvStore, MemoryKvStore, ScopedKvStore, SurrealKvStore};
