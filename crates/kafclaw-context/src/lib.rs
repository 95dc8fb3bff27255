//! KafClaw Context — the system-prompt assembler (spec §4.5, C6).
//!
//! Builds the single system message sent to the LLM each turn: identity,
//! bootstrap/soul files, legacy static memory, tool-list summary,
//! per-request framing, a cognitive hint, working memory, dated
//! observations, and RAG recall, each appended under byte-budget discipline
//! (see [`budget`]) and — for recalled content — wrapped against prompt
//! injection (see [`trust`]).
//!
//! Grounded on the teacher's `astrid-workspace` (bootstrap file discovery,
//! `astrid-tools::instructions`) and `astrid-runtime::runtime` (the general
//! shape of a per-turn context-assembly pass), generalized to the layered
//! section list spec §4.5 names. This crate has no fallible operations of
//! its own — file reads fall back to empty sections on any I/O error,
//! matching the teacher's `load_project_instructions` — so, unlike most
//! other crates in this workspace, it defines no dedicated error type.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod bootstrap;
pub mod budget;
pub mod builder;
pub mod cognitive;
pub mod identity;
pub mod trust;

pub use budget::{ContextBudget, OverflowCounters, SectionKind};
pub use builder::{
    BuiltContext, ContextBuilder, ContextRequest, HistoryMessage, ObservationNote, RecallResult,
    ToolSummary,
};
pub use cognitive::CognitiveHint;
