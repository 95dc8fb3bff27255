//! Prelude — commonly used types for convenient import.
//!
//! ```rust,no_run
//! use kafclaw_telemetry::prelude::*;
//! ```

pub use crate::{LogConfig, LogFormat, LogTarget};
pub use crate::{RequestContext, RequestGuard};
pub use crate::{TelemetryError, TelemetryResult};
pub use crate::{setup_default_logging, setup_logging};
