//! KafClaw Crypto — content hashing and canonical JSON for the audit chain.
//!
//! The audit chain (spec §4.12, §9) needs two primitives: a content hash
//! and a canonical serialization that both writer and verifier agree on.
//! This crate provides both, plus the deterministic id scheme used for
//! `MemoryChunk` dedup (`id = hash(source, content)`).
//!
//! Unlike the teacher's `astrid-crypto`, this crate carries no ed25519
//! signing material: the spec's trust model for this core is a hash-linked
//! JSONL log, not a signed capability system (see `DESIGN.md`). The hash
//! primitive itself is SHA-256 rather than the teacher's BLAKE3, because
//! the spec's audit-chain invariant names SHA-256 explicitly.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod canonical;
pub mod hash;

pub use canonical::canonicalize;
pub use hash::ContentHash;
