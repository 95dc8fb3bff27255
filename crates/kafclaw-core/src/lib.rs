//! KafClaw Core — foundation types shared across the agent core.
//!
//! This crate provides:
//! - Identifiers used throughout the runtime (trace, task, session, run ids)
//! - The inbound/outbound message schema that is the only thing channel
//!   adapters and the Agent Loop agree on
//! - A `Clock` abstraction so timing-sensitive components (approval
//!   timeouts, delivery backoff, daily quotas) can be driven deterministically
//!   in tests
//! - Shared message-type and tier enums used by the policy engine

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod clock;
pub mod ids;
pub mod message;
pub mod tier;

pub use clock::{Clock, FakeClock, SystemClock};
pub use ids::{ApprovalId, ChatKey, RunId, SessionKey, TaskId, TraceId};
pub use message::{InboundMessage, InboundMetadata, MessageType, OutboundMessage};
pub use tier::Tier;
