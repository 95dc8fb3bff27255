//! Bridges [`TaskStore`] to [`kafclaw_scheduler::delivery::DeliverySink`]
//! (spec §4.11 C12 Delivery Worker), converting between this crate's
//! typed [`AgentTask`] model and the scheduler's plain-`String`
//! [`PendingDelivery`] shape — the scheduler crate cannot depend on
//! `kafclaw-runtime`, so this is the seam the crate table's dependency
//! direction requires.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kafclaw_bus::OutboundBus;
use kafclaw_core::{OutboundMessage, TaskId, TraceId};
use kafclaw_scheduler::{DeliverySink, PendingDelivery, SchedulerError, SchedulerResult};
use uuid::Uuid;

use crate::task::{DeliveryStatus, TaskStore};

/// Implements [`DeliverySink`] over a [`TaskStore`] and an [`OutboundBus`].
pub struct TaskDeliverySink {
    tasks: Arc<TaskStore>,
    outbound: Arc<OutboundBus>,
}

impl TaskDeliverySink {
    #[must_use]
    pub fn new(tasks: Arc<TaskStore>, outbound: Arc<OutboundBus>) -> Self {
        Self { tasks, outbound }
    }

    fn parse_task_id(task_id: &str) -> SchedulerResult<TaskId> {
        let raw = task_id.strip_prefix("task:").unwrap_or(task_id);
        Uuid::from_str(raw)
            .map(TaskId)
            .map_err(|e| SchedulerError::Delivery(format!("malformed task id {task_id}: {e}")))
    }
}

#[async_trait]
impl DeliverySink for TaskDeliverySink {
    async fn pending_deliveries(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<PendingDelivery>> {
        let tasks = self
            .tasks
            .list_all()
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))?;

        Ok(tasks
            .into_iter()
            .filter(|t| t.delivery_status == DeliveryStatus::Pending)
            .filter(|t| t.next_retry_at.is_none_or(|next| next <= now))
            .filter(|t| t.content_out.is_some())
            .map(|t| PendingDelivery {
                task_id: t.id.to_string(),
                trace_id: t.trace_id.to_string(),
                channel: t.channel,
                chat_id: t.chat_id,
                content_out: t.content_out.unwrap_or_default(),
                attempts: t.delivery_attempts,
            })
            .collect())
    }

    async fn publish(&self, item: &PendingDelivery) -> SchedulerResult<bool> {
        let task_id = Self::parse_task_id(&item.task_id)?;
        let raw_trace = item
            .trace_id
            .strip_prefix("trace:")
            .unwrap_or(&item.trace_id);
        let trace_id = Uuid::from_str(raw_trace)
            .map(TraceId)
            .map_err(|e| SchedulerError::Delivery(format!("malformed trace id {raw_trace}: {e}")))?;

        let count = self.outbound.publish(OutboundMessage {
            channel: item.channel.clone(),
            chat_id: item.chat_id.clone(),
            trace_id,
            task_id,
            content: item.content_out.clone(),
        });
        Ok(count > 0)
    }

    async fn mark_sent(&self, task_id: &str) -> SchedulerResult<()> {
        let id = Self::parse_task_id(task_id)?;
        let mut task = self
            .tasks
            .get(id)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))?
            .ok_or_else(|| SchedulerError::Delivery(format!("unknown task {task_id}")))?;
        task.delivery_status = DeliveryStatus::Sent;
        task.updated_at = Utc::now();
        self.tasks
            .put(&task)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))
    }

    async fn record_retry(
        &self,
        task_id: &str,
        attempts: u32,
        next_retry_at: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        let id = Self::parse_task_id(task_id)?;
        let mut task = self
            .tasks
            .get(id)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))?
            .ok_or_else(|| SchedulerError::Delivery(format!("unknown task {task_id}")))?;
        task.delivery_attempts = attempts;
        task.next_retry_at = Some(next_retry_at);
        self.tasks
            .put(&task)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))
    }

    async fn mark_failed(&self, task_id: &str) -> SchedulerResult<()> {
        let id = Self::parse_task_id(task_id)?;
        let mut task = self
            .tasks
            .get(id)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))?
            .ok_or_else(|| SchedulerError::Delivery(format!("unknown task {task_id}")))?;
        task.delivery_status = DeliveryStatus::Failed;
        task.updated_at = Utc::now();
        self.tasks
            .put(&task)
            .await
            .map_err(|e| SchedulerError::Delivery(e.to_string()))
    }
}
