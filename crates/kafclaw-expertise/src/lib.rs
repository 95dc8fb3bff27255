//! KafClaw Expertise — the skill expertise tracker (spec §3 `ExpertiseRow`,
//! §4.9, C10).
//!
//! Not grounded on a single teacher file — the teacher has no skill-scoring
//! component — so this crate follows the workspace's general `KvStore`
//! aggregate-row idiom, the same shape as `kafclaw-memory::store`: one JSON
//! row per key, read-modify-write on each event.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod classifier;
pub mod error;
pub mod tracker;
pub mod types;

pub use classifier::{classify, SkillDomain};
pub use error::{ExpertiseError, ExpertiseResult};
pub use tracker::ExpertiseTracker;
pub use types::{compute_trend, Action, ExpertiseRow, SkillEvent, Trend};
