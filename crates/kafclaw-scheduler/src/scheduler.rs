//! The Scheduler (spec §4.10, C11): cron-matched synthetic inbound
//! publication under a per-category concurrency limit and a cross-process
//! tick lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kafclaw_bus::InboundBus;
use kafclaw_core::{InboundMessage, InboundMetadata};
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SchedulerResult;
use crate::job::{JobCategory, LastStatus, ScheduledJob};
use crate::lock;

/// Default per-category concurrency limits (spec §4.10).
pub const DEFAULT_LLM_CONCURRENCY: usize = 3;
/// See [`DEFAULT_LLM_CONCURRENCY`].
pub const DEFAULT_SHELL_CONCURRENCY: usize = 1;
/// See [`DEFAULT_LLM_CONCURRENCY`].
pub const DEFAULT_DEFAULT_CONCURRENCY: usize = 5;

/// Default tick interval (spec §4.10: "on each tick (default 60s)").
pub const DEFAULT_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

struct CategorySemaphores {
    llm: Arc<Semaphore>,
    shell: Arc<Semaphore>,
    default: Arc<Semaphore>,
}

impl CategorySemaphores {
    fn new(llm: usize, shell: usize, default: usize) -> Self {
        Self {
            llm: Arc::new(Semaphore::new(llm)),
            shell: Arc::new(Semaphore::new(shell)),
            default: Arc::new(Semaphore::new(default)),
        }
    }

    fn for_category(&self, category: JobCategory) -> &Arc<Semaphore> {
        match category {
            JobCategory::Llm => &self.llm,
            JobCategory::Shell => &self.shell,
            JobCategory::Default => &self.default,
        }
    }
}

/// Runs registered [`ScheduledJob`]s against the inbound bus.
pub struct Scheduler {
    bus: Arc<InboundBus>,
    jobs: Mutex<Vec<ScheduledJob>>,
    semaphores: CategorySemaphores,
    lock_path: PathBuf,
    tick_interval: std::time::Duration,
}

impl Scheduler {
    /// Build a scheduler publishing onto `bus`, with the default
    /// per-category concurrency limits and tick interval.
    #[must_use]
    pub fn new(bus: Arc<InboundBus>, lock_path: PathBuf) -> Self {
        Self::with_limits(
            bus,
            lock_path,
            DEFAULT_LLM_CONCURRENCY,
            DEFAULT_SHELL_CONCURRENCY,
            DEFAULT_DEFAULT_CONCURRENCY,
            DEFAULT_TICK_INTERVAL,
        )
    }

    /// Build a scheduler with explicit per-category limits and tick interval.
    #[must_use]
    pub fn with_limits(
        bus: Arc<InboundBus>,
        lock_path: PathBuf,
        llm_concurrency: usize,
        shell_concurrency: usize,
        default_concurrency: usize,
        tick_interval: std::time::Duration,
    ) -> Self {
        Self {
            bus,
            jobs: Mutex::new(Vec::new()),
            semaphores: CategorySemaphores::new(llm_concurrency, shell_concurrency, default_concurrency),
            lock_path,
            tick_interval,
        }
    }

    /// Register a job.
    pub async fn register(&self, job: ScheduledJob) {
        self.jobs.lock().await.push(job);
    }

    /// Run one tick against `minute` (normally `Utc::now()`, truncated by
    /// each job's own cron match). Returns the outcome recorded per job
    /// name, for test inspection and observability.
    ///
    /// Acquires the process-level tick lock non-blockingly; if another
    /// process holds it, this returns an empty map immediately (spec
    /// §4.10 step 1: "skip silently").
    ///
    /// # Errors
    ///
    /// Returns an error if the lock file cannot be accessed.
    pub async fn tick(&self, minute: DateTime<Utc>) -> SchedulerResult<HashMap<String, LastStatus>> {
        let Some(_held) = lock::try_acquire(&self.lock_path)? else {
            info!("scheduler tick skipped: lock held by another process");
            return Ok(HashMap::new());
        };

        let mut outcomes = HashMap::new();
        let mut jobs = self.jobs.lock().await;
        for job in jobs.iter_mut() {
            if !job.matches(minute) {
                continue;
            }

            let semaphore = self.semaphores.for_category(job.category).clone();
            let Ok(permit) = semaphore.try_acquire_owned() else {
                warn!(job = %job.name, "scheduler tick skipped, category concurrency saturated");
                job.last_run = Some(minute);
                job.last_status = Some(LastStatus::SkippedConcurrency);
                outcomes.insert(job.name.clone(), LastStatus::SkippedConcurrency);
                continue;
            };

            let metadata = InboundMetadata {
                message_type: kafclaw_core::MessageType::Internal,
                scheduler_job: Some(job.name.clone()),
                scheduler_tick: Some(minute),
                ..Default::default()
            };
            let msg = InboundMessage::new(
                "scheduler",
                "scheduler",
                job.synthetic_chat_id(),
                job.content.clone(),
                None,
            )
            .with_metadata(metadata);

            self.bus.publish(msg)?;
            drop(permit);

            job.last_run = Some(minute);
            job.last_status = Some(LastStatus::Dispatched);
            outcomes.insert(job.name.clone(), LastStatus::Dispatched);
        }

        Ok(outcomes)
    }

    /// Run ticks on `tick_interval` until `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) {
        let mut interval = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                _ = interval.tick() => {
                    let minute = Utc::now();
                    if let Err(e) = self.tick(minute).await {
                        warn!(error = %e, "scheduler tick failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bus() -> Arc<InboundBus> {
        Arc::new(InboundBus::new())
    }

    #[tokio::test]
    async fn matching_job_publishes_and_records_dispatched() {
        let dir = tempdir().unwrap();
        let scheduler = Scheduler::new(bus(), lock::default_lock_path(dir.path()));
        scheduler
            .register(ScheduledJob::new("heartbeat", "* * * * *", JobCategory::Default, "tick").unwrap())
            .await;

        let outcomes = scheduler.tick(Utc::now()).await.unwrap();
        assert_eq!(outcomes.get("heartbeat"), Some(&LastStatus::Dispatched));
    }

    #[tokio::test]
    async fn saturated_category_is_skipped() {
        let dir = tempdir().unwrap();
        let scheduler = Scheduler::with_limits(
            bus(),
            lock::default_lock_path(dir.path()),
            0,
            DEFAULT_SHELL_CONCURRENCY,
            DEFAULT_DEFAULT_CONCURRENCY,
            DEFAULT_TICK_INTERVAL,
        );
        scheduler
            .register(ScheduledJob::new("digest", "* * * * *", JobCategory::Llm, "go").unwrap())
            .await;

        let outcomes = scheduler.tick(Utc::now()).await.unwrap();
        assert_eq!(outcomes.get("digest"), Some(&LastStatus::SkippedConcurrency));
    }

    #[tokio::test]
    async fn non_matching_job_is_not_in_outcomes() {
        let dir = tempdir().unwrap();
        let scheduler = Scheduler::new(bus(), lock::default_lock_path(dir.path()));
        scheduler
            .register(
                ScheduledJob::new("yearly", "0 0 1 1 *", JobCategory::Default, "happy new year")
                    .unwrap(),
            )
            .await;

        let outcomes = scheduler.tick(Utc::now()).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn contended_tick_lock_skips_whole_tick() {
        let dir = tempdir().unwrap();
        let lock_path = lock::default_lock_path(dir.path());
        let _held = lock::try_acquire(&lock_path).unwrap().unwrap();

        let scheduler = Scheduler::new(bus(), lock_path);
        scheduler
            .register(ScheduledJob::new("heartbeat", "* * * * *", JobCategory::Default, "tick").unwrap())
            .await;

        let outcomes = scheduler.tick(Utc::now()).await.unwrap();
        assert!(outcomes.is_empty());
    }
}
