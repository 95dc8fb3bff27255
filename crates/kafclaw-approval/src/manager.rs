//! The approval state machine (spec §4.4, C5).
//!
//! `create` registers a pending request, `wait` blocks a caller (typically
//! the Agent Loop) until the request reaches a terminal state or a deadline
//! elapses, and `respond` is driven by an inbound `approve:<id>` / `deny:<id>`
//! reply. All three are safe to call concurrently from different tasks.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use kafclaw_core::{ApprovalId, ChatKey, TaskId, Tier, TraceId};
use serde_json::Value;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApprovalError, ApprovalResult};
use crate::request::{ApprovalRequest, ApprovalState};

struct ApprovalSlot {
    request: RwLock<ApprovalRequest>,
    notify: Notify,
}

/// Coordinates pending tool-call approvals across chat replies and waiting
/// agent turns.
///
/// Internally a `DashMap` keyed by [`ApprovalId`] holding one
/// [`ApprovalSlot`] per request. Each slot pairs the request's mutable state
/// with a `Notify` so `wait` callers wake as soon as `respond` (or the
/// timeout path) lands a terminal state, rather than polling.
#[derive(Debug, Clone, Default)]
pub struct ApprovalManager {
    slots: Arc<DashMap<ApprovalId, Arc<ApprovalSlot>>>,
}

impl ApprovalManager {
    /// Build an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending approval request and return it.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        tool: impl Into<String>,
        tier: Tier,
        arguments: Value,
        sender: impl Into<String>,
        channel: impl Into<String>,
        chat_id: impl Into<ChatKey>,
        trace_id: TraceId,
        task_id: TaskId,
        now: chrono::DateTime<chrono::Utc>,
    ) -> ApprovalRequest {
        let request = ApprovalRequest::new(
            tool, tier, arguments, sender, channel, chat_id, trace_id, task_id, now,
        );
        let slot = Arc::new(ApprovalSlot {
            request: RwLock::new(request.clone()),
            notify: Notify::new(),
        });
        self.slots.insert(request.approval_id.clone(), slot);
        debug!(approval_id = %request.approval_id, "approval request created");
        request
    }

    /// Look up the current state of an approval without waiting.
    pub async fn state(&self, id: &ApprovalId) -> ApprovalResult<ApprovalState> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| ApprovalError::UnknownApproval(id.clone()))?
            .clone();
        let request = slot.request.read().await;
        Ok(request.state_field())
    }

    /// Wait until `id` reaches a terminal state or `timeout` elapses.
    ///
    /// Returns immediately if the request is already terminal. On deadline
    /// elapse, atomically promotes a still-pending request to
    /// [`ApprovalState::Timeout`] and wakes any other concurrent waiters.
    pub async fn wait(
        &self,
        id: &ApprovalId,
        timeout: Duration,
    ) -> ApprovalResult<ApprovalState> {
        self.wait_cancellable(id, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`Self::wait`], but also returns early (as [`ApprovalState::Timeout`])
    /// if `cancel` fires first. Used so a process shutdown doesn't leave the
    /// Agent Loop hung on an approval forever.
    pub async fn wait_cancellable(
        &self,
        id: &ApprovalId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ApprovalResult<ApprovalState> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| ApprovalError::UnknownApproval(id.clone()))?
            .clone();

        {
            let request = slot.request.read().await;
            if request.state_field().is_terminal() {
                return Ok(request.state_field());
            }
        }

        tokio::select! {
            () = tokio::time::sleep(timeout) => {
                let mut request = slot.request.write().await;
                if !request.state_field().is_terminal() {
                    request.set_state(ApprovalState::Timeout);
                    warn!(approval_id = %id, "approval timed out");
                }
                let state = request.state_field();
                drop(request);
                slot.notify.notify_waiters();
                Ok(state)
            }
            () = slot.notify.notified() => {
                let request = slot.request.read().await;
                Ok(request.state_field())
            }
            () = cancel.cancelled() => {
                let mut request = slot.request.write().await;
                if !request.state_field().is_terminal() {
                    request.set_state(ApprovalState::Timeout);
                }
                Ok(request.state_field())
            }
        }
    }

    /// Apply a user's `approve:<id>` / `deny:<id>` reply.
    ///
    /// Errors with [`ApprovalError::UnknownApproval`] for an id that was
    /// never created. Responding to an id that is already terminal is a
    /// silent no-op (spec §4.4: idempotent once terminal), since retried or
    /// duplicate replies must not double-count or error.
    pub async fn respond(&self, id: &ApprovalId, approved: bool) -> ApprovalResult<()> {
        let slot = self
            .slots
            .get(id)
            .ok_or_else(|| ApprovalError::UnknownApproval(id.clone()))?
            .clone();

        let mut request = slot.request.write().await;
        if request.state_field().is_terminal() {
            debug!(approval_id = %id, "response to already-terminal approval ignored");
            return Ok(());
        }

        request.set_state(if approved {
            ApprovalState::Approved
        } else {
            ApprovalState::Denied
        });
        drop(request);
        slot.notify.notify_waiters();
        Ok(())
    }
}
