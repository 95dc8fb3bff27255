//! KafClaw Scheduler — cron-matched synthetic inbound dispatch (C11) and
//! the delivery-retry worker (C12), spec §4.10-§4.11.
//!
//! Neither component has a direct teacher-file ancestor (the teacher has no
//! cron scheduler or delivery-retry worker); both follow the workspace's
//! general tokio background-task conventions — `CancellationToken`-driven
//! loops, `Semaphore`-gated concurrency, `fs2`-backed exclusive locking —
//! already established by `kafclaw-bus` and `kafclaw-audit`.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod delivery;
pub mod error;
pub mod job;
pub mod lock;
pub mod scheduler;

pub use delivery::{
    backoff_seconds, DeliverySink, DeliveryWorker, PendingDelivery, BASE_BACKOFF_SECS,
    DEFAULT_MAX_RETRY, DEFAULT_POLL_INTERVAL, MAX_BACKOFF_SECS,
};
pub use error::{SchedulerError, SchedulerResult};
pub use job::{JobCategory, LastStatus, ScheduledJob};
pub use lock::{default_lock_path, try_acquire, TickLock};
pub use scheduler::{
    Scheduler, DEFAULT_DEFAULT_CONCURRENCY, DEFAULT_LLM_CONCURRENCY, DEFAULT_SHELL_CONCURRENCY,
    DEFAULT_TICK_INTERVAL,
};
