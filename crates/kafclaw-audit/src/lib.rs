//! KafClaw Audit — the hash-linked JSONL audit chain (spec §4.12, §9, C13).
//!
//! Every security-relevant decision in the agent core (policy evaluations,
//! approval transitions, task completions, LLM/TOOL spans) is append-only
//! and tamper-evident: each JSONL line carries the SHA-256 hash of the
//! previous line (`prevHash`) and its own canonical-JSON hash (`hash`).
//! [`verify_chain`] walks a file and reports the first broken link, giving
//! an operational way to check the spec §8 chain-integrity property.
//!
//! Grounded on the teacher's `astrid-audit` crate (chain-linked entries,
//! one audited write path per security concern) with the storage swapped
//! from `SurrealKV` rows to a plain JSONL file under an exclusive lock,
//! because spec §6 pins the on-disk format explicitly.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chain;
pub mod error;
pub mod security;

pub use chain::{entry_time, verify_chain, AuditChain, ChainVerification};
pub use error::{AuditError, AuditResult};
pub use security::{SecurityAuditRecorder, SECURITY_EVENTS_FILE};
