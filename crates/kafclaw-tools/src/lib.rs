//! KafClaw Tools — the built-in tool registry (spec §4.2, C3).
//!
//! Each tool exposes `{name, description, parameters, tier, execute}` and is
//! dispatched by name from the Agent Loop after the Policy Engine clears
//! (or the Approval Manager resolves) its call. Grounded on the teacher's
//! `astrid-tools` crate: the `BuiltinTool` trait, `ToolContext` (shared
//! `cwd` across invocations), and the per-tool module layout all mirror it
//! directly. Two differences from the teacher:
//!
//! - Tool results given to the LLM are never truncated (spec §4.2); only
//!   the copy written into logging/audit metadata is capped, via
//!   [`registry::truncate_for_log`] rather than the teacher's single
//!   `truncate_output` used uniformly everywhere.
//! - No `task`/`spark` tools here: sub-agent spawning needs the Supervisor
//!   (`kafclaw-runtime`), which this crate cannot depend on without a
//!   cycle, so that tool is registered by `kafclaw-runtime` itself against
//!   this crate's [`ToolRegistry`].

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builtin;
pub mod context;
pub mod error;
pub mod registry;

pub use context::{ToolContext, TurnIdentity};
pub use error::{ToolError, ToolResult};
pub use registry::{truncate_for_log, BuiltinTool, ToolDefinition, ToolRegistry, LOG_TRUNCATION_BYTES};
