//! KafClaw Memory — `MemoryChunk` store with retention/pruning, and the
//! Memory Observer/Reflector (spec §3 `MemoryChunk`/`Observation`, §4.8, C9).
//!
//! Three concerns live here:
//! - [`store`]: the `MemoryChunk` store, deterministic-id upsert, retention
//!   sweep, and hard-cap pruning.
//! - [`observation`]: the Observer half of C9 — batches unobserved turns
//!   into dated, prioritized [`observation::Observation`] rows once a
//!   session's queue crosses a threshold.
//! - [`reflector`]: the Reflector half of C9 — consolidates accumulated
//!   observations down to ~60% of their count once they exceed a cap,
//!   without losing any `high`-priority entry.
//!
//! Grounded on `astrid-storage`'s `KvStore`/`ScopedKvStore` pattern (no
//! memory-shaped crate was present in the teacher itself); the
//! `TextCompressor`/`Reflector` trait split mirrors the teacher's
//! `LlmProvider` external-collaborator seam (`kafclaw-llm`), since both
//! Observer and Reflector drive an LLM call this crate does not own.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chunk;
pub mod error;
pub mod observation;
pub mod reflector;
pub mod retention;
pub mod store;

pub use chunk::MemoryChunk;
pub use error::{MemoryError, MemoryResult};
pub use observation::{
    parse_observations, Observation, ObservationQueue, ObservationStore, Priority, TextCompressor,
    DEFAULT_OBSERVATION_THRESHOLD,
};
pub use reflector::{parse_consolidated, Reflector, DEFAULT_MAX_OBSERVATIONS};
pub use retention::{classify, Retention};
pub use store::{MemoryStore, DEFAULT_MAX_CHUNKS};
