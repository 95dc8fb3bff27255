//! KafClaw Bus — the Message Bus component (spec §4.1).
//!
//! A single consumer on the inbound side (the Agent Loop) guarantees total
//! order per process; outbound fan-out is per-channel broadcast with FIFO
//! delivery and no backpressure on slow subscribers (they drop the oldest
//! message instead), following the teacher's `astrid-events::EventBus`
//! broadcast-channel design.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod inbound;
pub mod outbound;

pub use error::{BusError, BusResult};
pub use inbound::{InboundBus, DEFAULT_INBOUND_CAPACITY};
pub use outbound::{OutboundBus, OutboundReceiver, DEFAULT_OUTBOUND_CAPACITY};
