//! KafClaw Approval — the interactive approval-gate state machine (spec
//! §4.4, C5).
//!
//! When the policy engine (`kafclaw-policy`) marks a tool call as
//! `requires_approval`, the Agent Loop calls [`ApprovalManager::create`] to
//! register a pending request, sends its prompt text to the owning chat,
//! and calls [`ApprovalManager::wait`] to block the turn until the user
//! replies with `approve:<id>` / `deny:<id>` (routed back in by the channel
//! adapter to [`ApprovalManager::respond`]) or the configured timeout
//! elapses.
//!
//! Grounded on the teacher's `astrid-approval` crate for the general shape
//! of an async approval coordinator, but considerably leaner: the teacher's
//! `ApprovalManager` also juggles an `AllowanceStore` (remembered
//! always-allow grants) and a `DeferredResolutionStore` (out-of-band
//! resolution channels) that this spec has no equivalent for — its approval
//! model is a plain per-request `Pending -> {Approved, Denied, Timeout}`
//! machine with no persistence across requests.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod manager;
pub mod request;

pub use error::{ApprovalError, ApprovalResult};
pub use manager::ApprovalManager;
pub use request::{acknowledgement_text, ApprovalRequest, ApprovalState};
