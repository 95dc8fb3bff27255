//! KafClaw Runtime — the Agent Loop and everything it owns directly: task
//! and session persistence, the timeline, delivery bridging, daily quota,
//! policy-decision logging, auto-indexing into memory, Day2Day capture, the
//! attack-intent refusal gate, and the Sub-agent Supervisor (spec §4.6-§4.7,
//! C7-C8).
//!
//! Every other crate in the workspace is a narrow, single-concern seam
//! (`kafclaw-policy` decides, `kafclaw-approval` waits, `kafclaw-context`
//! assembles a system message, `kafclaw-memory` stores chunks); this crate
//! is where those seams are driven in the fixed per-message order spec §4.6
//! specifies. Grounded on the teacher's `astrid-runtime::runtime` module,
//! which plays the identical orchestrating role over the same cast of
//! narrow collaborators.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod agent;
pub mod attack_intent;
pub mod compressor;
pub mod config;
pub mod day2day;
pub mod delivery;
pub mod error;
pub mod indexer;
pub mod policy_store;
pub mod quota;
pub mod session;
pub mod subagent;
pub mod spawn_tool;
pub mod task;
pub mod timeline;
pub mod turn;

pub use agent::AgentLoop;
pub use compressor::LlmTextCompressor;
pub use config::LoopConfig;
pub use delivery::TaskDeliverySink;
pub use error::{RuntimeError, RuntimeResult};
pub use indexer::AutoIndexer;
pub use policy_store::PolicyDecisionStore;
pub use session::{Session, SessionStore, StoredMessage, MAX_HISTORY_MESSAGES};
pub use subagent::{SubagentRun, SubagentSupervisor, SubagentToolPolicy, RunStatus};
pub use task::{AgentTask, DeliveryStatus, TaskStatus, TaskStore};
pub use timeline::{classification, TimelineEvent, TimelineStore, SPAN_TEXT_CAP_BYTES};
pub use turn::TurnContext;
