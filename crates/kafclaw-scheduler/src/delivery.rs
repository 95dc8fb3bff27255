//! The Delivery Worker (spec §4.11, C12): polls completed tasks with
//! `deliveryStatus = pending` and retries outbound delivery with
//! exponential backoff.
//!
//! This crate never sees `AgentTask` directly (that type is owned by
//! `kafclaw-runtime`, per the crate-layer dependency direction in
//! `SPEC_FULL.md`'s crate table). [`DeliverySink`] is the same kind of
//! pluggable-collaborator seam as `kafclaw-memory`'s `TextCompressor`:
//! `kafclaw-runtime` implements it over its task store, and this crate
//! drives the retry loop against the trait.
//!
//! Spec §4.11 states delivery is published "optimistically" and that
//! "channel subscribers may later overwrite on failure signal" — this
//! worker treats [`DeliverySink::publish`]'s own return value as that
//! signal (whether the outbound bus actually reached a subscriber),
//! since nothing else in this workspace models a separate asynchronous
//! failure channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SchedulerResult;

/// Default maximum delivery attempts before a task is marked `failed`
/// (spec §4.11).
pub const DEFAULT_MAX_RETRY: u32 = 5;
/// Base backoff duration (spec §4.11: `30s * 2^attempts`).
pub const BASE_BACKOFF_SECS: i64 = 30;
/// Backoff cap (spec §4.11: capped at 5 minutes).
pub const MAX_BACKOFF_SECS: i64 = 300;
/// Default poll interval (spec §4.11: "every 5s").
pub const DEFAULT_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);

/// One task awaiting outbound delivery.
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    /// The task's id.
    pub task_id: String,
    /// Trace id the task was produced under.
    pub trace_id: String,
    /// Destination channel.
    pub channel: String,
    /// Destination chat id.
    pub chat_id: String,
    /// Reply text to deliver.
    pub content_out: String,
    /// Delivery attempts made so far.
    pub attempts: u32,
}

/// The task-store collaborator the Delivery Worker polls and updates.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Fetch every completed task currently eligible for a delivery
    /// attempt (`deliveryStatus = pending` and past its `nextRetryAt`, if
    /// any).
    async fn pending_deliveries(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<PendingDelivery>>;

    /// Attempt to publish `item` on the outbound bus. Returns whether a
    /// subscriber actually received it.
    async fn publish(&self, item: &PendingDelivery) -> SchedulerResult<bool>;

    /// Record a successful delivery.
    async fn mark_sent(&self, task_id: &str) -> SchedulerResult<()>;

    /// Record a failed attempt, scheduling the next retry at `next_retry_at`
    /// with the incremented attempt count.
    async fn record_retry(
        &self,
        task_id: &str,
        attempts: u32,
        next_retry_at: DateTime<Utc>,
    ) -> SchedulerResult<()>;

    /// Record exhaustion of the retry budget.
    async fn mark_failed(&self, task_id: &str) -> SchedulerResult<()>;
}

/// Compute the next backoff delay for `attempts` already made (spec §4.11:
/// `min(30s * 2^attempts, 5min)`).
#[must_use]
pub fn backoff_seconds(attempts: u32) -> i64 {
    let exponential = BASE_BACKOFF_SECS.saturating_mul(1i64 << attempts.min(20));
    exponential.min(MAX_BACKOFF_SECS)
}

/// Drives [`DeliverySink`] through one retry pass.
pub struct DeliveryWorker {
    max_retry: u32,
}

impl DeliveryWorker {
    /// Build a worker using the default max retry count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_retry(DEFAULT_MAX_RETRY)
    }

    /// Build a worker with an explicit max retry count.
    #[must_use]
    pub fn with_max_retry(max_retry: u32) -> Self {
        Self { max_retry }
    }

    /// Run one pass: fetch eligible tasks from `sink` and process each.
    ///
    /// # Errors
    ///
    /// Returns an error if `sink` fails to enumerate pending deliveries.
    pub async fn run_once(&self, sink: &dyn DeliverySink, now: DateTime<Utc>) -> SchedulerResult<()> {
        for item in sink.pending_deliveries(now).await? {
            self.process_one(sink, item, now).await?;
        }
        Ok(())
    }

    async fn process_one(
        &self,
        sink: &dyn DeliverySink,
        item: PendingDelivery,
        now: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        if item.attempts >= self.max_retry {
            sink.mark_failed(&item.task_id).await?;
            return Ok(());
        }

        if sink.publish(&item).await? {
            sink.mark_sent(&item.task_id).await?;
        } else {
            let next_attempts = item.attempts + 1;
            if next_attempts >= self.max_retry {
                sink.mark_failed(&item.task_id).await?;
            } else {
                let next_retry_at = now + chrono::Duration::seconds(backoff_seconds(item.attempts));
                sink.record_retry(&item.task_id, next_attempts, next_retry_at)
                    .await?;
            }
        }
        Ok(())
    }
}

impl Default for DeliveryWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSink {
        items: Mutex<Vec<PendingDelivery>>,
        publish_result: Mutex<bool>,
        sent: Mutex<Vec<String>>,
        retried: Mutex<Vec<(String, u32)>>,
        failed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DeliverySink for FakeSink {
        async fn pending_deliveries(&self, _now: DateTime<Utc>) -> SchedulerResult<Vec<PendingDelivery>> {
            Ok(self.items.lock().unwrap().clone())
        }

        async fn publish(&self, _item: &PendingDelivery) -> SchedulerResult<bool> {
            Ok(*self.publish_result.lock().unwrap())
        }

        async fn mark_sent(&self, task_id: &str) -> SchedulerResult<()> {
            self.sent.lock().unwrap().push(task_id.to_string());
            Ok(())
        }

        async fn record_retry(
            &self,
            task_id: &str,
            attempts: u32,
            _next_retry_at: DateTime<Utc>,
        ) -> SchedulerResult<()> {
            self.retried.lock().unwrap().push((task_id.to_string(), attempts));
            Ok(())
        }

        async fn mark_failed(&self, task_id: &str) -> SchedulerResult<()> {
            self.failed.lock().unwrap().push(task_id.to_string());
            Ok(())
        }
    }

    fn item(task_id: &str, attempts: u32) -> PendingDelivery {
        PendingDelivery {
            task_id: task_id.to_string(),
            trace_id: "t1".to_string(),
            channel: "cli".to_string(),
            chat_id: "c1".to_string(),
            content_out: "hello".to_string(),
            attempts,
        }
    }

    #[test]
    fn backoff_doubles_and_caps_at_five_minutes() {
        assert_eq!(backoff_seconds(0), 30);
        assert_eq!(backoff_seconds(1), 60);
        assert_eq!(backoff_seconds(2), 120);
        assert_eq!(backoff_seconds(10), 300);
    }

    #[tokio::test]
    async fn successful_publish_marks_sent() {
        let sink = FakeSink::default();
        *sink.publish_result.lock().unwrap() = true;
        sink.items.lock().unwrap().push(item("task-1", 0));

        let worker = DeliveryWorker::new();
        worker.run_once(&sink, Utc::now()).await.unwrap();

        assert_eq!(sink.sent.lock().unwrap().as_slice(), ["task-1"]);
        assert!(sink.retried.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_schedules_retry() {
        let sink = FakeSink::default();
        *sink.publish_result.lock().unwrap() = false;
        sink.items.lock().unwrap().push(item("task-1", 1));

        let worker = DeliveryWorker::new();
        worker.run_once(&sink, Utc::now()).await.unwrap();

        assert_eq!(sink.retried.lock().unwrap().as_slice(), [("task-1".to_string(), 2)]);
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn attempts_at_max_retry_marks_failed_without_publishing() {
        let sink = FakeSink::default();
        sink.items.lock().unwrap().push(item("task-1", DEFAULT_MAX_RETRY));

        let worker = DeliveryWorker::new();
        worker.run_once(&sink, Utc::now()).await.unwrap();

        assert_eq!(sink.failed.lock().unwrap().as_slice(), ["task-1"]);
    }

    #[tokio::test]
    async fn failure_on_last_allowed_attempt_marks_failed_not_retried() {
        let sink = FakeSink::default();
        *sink.publish_result.lock().unwrap() = false;
        sink.items.lock().unwrap().push(item("task-1", DEFAULT_MAX_RETRY - 1));

        let worker = DeliveryWorker::new();
        worker.run_once(&sink, Utc::now()).await.unwrap();

        assert_eq!(sink.failed.lock().unwrap().as_slice(), ["task-1"]);
        assert!(sink.retried.lock().unwrap().is_empty());
    }
}
