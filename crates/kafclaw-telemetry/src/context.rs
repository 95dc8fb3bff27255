//! Request context for correlation and tracing across process boundaries.
//!
//! This is the generic correlation envelope a `tracing` subscriber and log
//! shipper expect (request/correlation/parent ids, timing); the Agent
//! Loop's own `TurnContext` carries the domain-specific fields (trace id,
//! task id, channel, chat id, sender, message type) and is built from one
//! of these at the point an inbound message enters the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Request context for correlation across operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Correlation ID shared by a request and everything it spawns.
    pub correlation_id: Uuid,
    /// Parent request ID if this is a sub-request (e.g. a sub-agent run).
    pub parent_id: Option<Uuid>,
    /// Session ID if within a channel session.
    pub session_id: Option<Uuid>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Source component that created this context.
    pub source: String,
    /// Operation being performed.
    pub operation: Option<String>,
    /// Additional metadata carried alongside every span built from this
    /// context.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context rooted at `source`.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            session_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a child context that inherits correlation info (used when the
    /// Sub-agent Supervisor spawns a nested loop under a parent trace).
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            session_id: self.session_id,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Set the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the session ID.
    #[must_use]
    pub fn with_session_id(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add a metadata key/value pair.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Build a `tracing` span carrying this context's correlation fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
        )
    }

    /// Whether this context has a parent (i.e. is a sub-request).
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Short identifier suitable for compact log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.to_string()[..8].to_string()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Guard that enters the context's span on construction and logs elapsed
/// time on drop.
pub struct RequestGuard {
    context: RequestContext,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter `context`'s span, logging start and (on drop) completion.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self { context, span }
    }

    /// The wrapped context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_is_self_correlated() {
        let ctx = RequestContext::new("test");
        assert_eq!(ctx.source, "test");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.parent_id.is_none());
    }

    #[test]
    fn builder_chain() {
        let session = Uuid::new_v4();
        let ctx = RequestContext::new("test")
            .with_session_id(session)
            .with_operation("test_op")
            .with_metadata("key", "value");

        assert_eq!(ctx.session_id, Some(session));
        assert_eq!(ctx.operation, Some("test_op".to_string()));
        assert_eq!(ctx.metadata.get("key"), Some(&"value".to_string()));
    }

    #[test]
    fn child_inherits_correlation_not_identity() {
        let session = Uuid::new_v4();
        let parent = RequestContext::new("parent").with_session_id(session);
        let child = parent.child("child");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.parent_id, Some(parent.request_id));
        assert_eq!(child.session_id, Some(session));
    }

    #[test]
    fn elapsed_advances() {
        let ctx = RequestContext::new("test");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn short_id_is_eight_chars() {
        let ctx = RequestContext::new("test");
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn round_trips_through_json() {
        let ctx = RequestContext::new("test").with_operation("test_op");
        let json = serde_json::to_string(&ctx).unwrap();
        let parsed: RequestContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source, "test");
        assert_eq!(parsed.operation, Some("test_op".to_string()));
    }
}
