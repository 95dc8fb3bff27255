//! KafClaw Telemetry — logging and tracing setup for the agent core
//! (SPEC_FULL §10.1).
//!
//! This crate provides:
//! - Configurable logging setup with multiple formats and targets
//! - A [`RequestContext`] for correlating log lines and spans across a
//!   single inbound message's processing (the loop's own [`TurnContext`]
//!   carries the domain fields; this carries the generic tracing
//!   correlation fields a process-wide `tracing` subscriber expects)
//!
//! [`TurnContext`]: https://docs.rs/kafclaw-runtime
//!
//! # Example
//!
//! ```rust,no_run
//! use kafclaw_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), kafclaw_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("kafclaw_runtime=debug");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("agent_loop").with_operation("process_message");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("processing inbound message");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
