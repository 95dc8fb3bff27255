//! `ScheduledJob` data model (spec §3, §4.10, C11).

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// Semaphore category a job's run competes for concurrency under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCategory {
    /// Jobs that invoke the LLM.
    Llm,
    /// Jobs that shell out.
    Shell,
    /// Anything else.
    Default,
}

/// Outcome recorded for a job's most recent tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastStatus {
    /// The job's synthetic message was published.
    Dispatched,
    /// The job's category semaphore was saturated; the tick was skipped.
    SkippedConcurrency,
}

/// A cron-scheduled job (spec §3 `ScheduledJob`).
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    /// Job name (used as part of the synthetic `chatID`).
    pub name: String,
    /// Parsed cron schedule.
    pub schedule: Schedule,
    /// Concurrency category.
    pub category: JobCategory,
    /// Content published as the synthetic inbound message.
    pub content: String,
    /// Timestamp of the job's last tick, if any.
    pub last_run: Option<DateTime<Utc>>,
    /// Outcome of the job's last tick, if any.
    pub last_status: Option<LastStatus>,
}

impl ScheduledJob {
    /// Build a job from a standard 5-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns an error if `cron_expr` does not parse as a valid cron
    /// schedule.
    pub fn new(
        name: impl Into<String>,
        cron_expr: &str,
        category: JobCategory,
        content: impl Into<String>,
    ) -> Result<Self, cron::error::Error> {
        // The `cron` crate expects a leading seconds field; spec §4.10
        // names standard 5-field cron, so a `0 ` prefix is added here.
        let schedule = Schedule::from_str(&format!("0 {cron_expr}"))?;
        Ok(Self {
            name: name.into(),
            schedule,
            category,
            content: content.into(),
            last_run: None,
            last_status: None,
        })
    }

    /// Whether this job's schedule matches `minute` (the current tick's
    /// truncated-to-the-minute timestamp).
    #[must_use]
    pub fn matches(&self, minute: DateTime<Utc>) -> bool {
        self.schedule
            .after(&(minute - chrono::Duration::seconds(1)))
            .next()
            .is_some_and(|next| next <= minute)
    }

    /// The synthetic chat id this job's messages are published under
    /// (spec §4.10: `chatID="scheduler:<job>"`).
    #[must_use]
    pub fn synthetic_chat_id(&self) -> String {
        format!("scheduler:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_minute_job_matches_any_minute() {
        let job = ScheduledJob::new("heartbeat", "* * * * *", JobCategory::Default, "tick").unwrap();
        let now = Utc::now();
        let truncated = now - chrono::Duration::nanoseconds(now.timestamp_subsec_nanos() as i64);
        assert!(job.matches(truncated));
    }

    #[test]
    fn synthetic_chat_id_is_namespaced() {
        let job = ScheduledJob::new("digest", "0 9 * * *", JobCategory::Llm, "send digest").unwrap();
        assert_eq!(job.synthetic_chat_id(), "scheduler:digest");
    }

    #[test]
    fn invalid_cron_expression_errors() {
        assert!(ScheduledJob::new("bad", "not a cron", JobCategory::Default, "x").is_err());
    }
}
