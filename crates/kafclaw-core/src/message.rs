//! The inbound/outbound message schema — the only contract between channel
//! adapters (CLI, chat gateways, group bus, scheduler) and the Agent Core.
//!
//! Channel adapters themselves (WhatsApp/HTTP/Kafka transports) are outside
//! this crate's scope; only the abstract message shape lives here.

use crate::ids::TraceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Trust class of an inbound message.
///
/// `External` is the conservative default: absent metadata is treated as
/// external, so callers that legitimately need internal framing must set
/// this explicitly (spec §9, Open Questions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// From the owning user or another trusted internal component.
    Internal,
    /// From an untrusted external sender.
    External,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::External
    }
}

/// Metadata carried on an [`InboundMessage`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundMetadata {
    /// Trust class of the message. Defaults to [`MessageType::External`]
    /// when absent from the wire payload.
    #[serde(default)]
    pub message_type: MessageType,
    /// Whether this message was sent by the agent's own account (echoed
    /// back by some chat gateways).
    #[serde(default)]
    pub is_from_me: Option<bool>,
    /// Name of the scheduled job that produced this message, if any.
    #[serde(default)]
    pub scheduler_job: Option<String>,
    /// Tick timestamp of the scheduler run that produced this message.
    #[serde(default)]
    pub scheduler_tick: Option<DateTime<Utc>>,
    /// Free-form extension fields, preserved but not interpreted by the core.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// A message arriving on the bus from any channel.
///
/// Immutable once published. `idempotency_key` is unique across the bus;
/// when absent it is synthesized as `auto:<channel>:<trace_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Originating channel (e.g. `"cli"`, `"whatsapp"`, `"scheduler"`).
    pub channel: String,
    /// Identifier of the sender within that channel.
    pub sender_id: String,
    /// Identifier of the chat/conversation within that channel.
    pub chat_id: String,
    /// Correlation id for this message and everything derived from it.
    pub trace_id: TraceId,
    /// Caller-supplied dedup key, or the synthesized fallback.
    pub idempotency_key: String,
    /// Raw message text.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Structured metadata (trust class, provenance, …).
    pub metadata: InboundMetadata,
}

impl InboundMessage {
    /// Build an inbound message, synthesizing `idempotency_key` when the
    /// caller does not supply one.
    #[must_use]
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
        idempotency_key: Option<String>,
    ) -> Self {
        let channel = channel.into();
        let trace_id = TraceId::new();
        let idempotency_key =
            idempotency_key.unwrap_or_else(|| format!("auto:{channel}:{trace_id}"));
        Self {
            channel,
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            trace_id,
            idempotency_key,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: InboundMetadata::default(),
        }
    }

    /// Attach metadata, returning `self` for chaining.
    #[must_use]
    pub fn with_metadata(mut self, metadata: InboundMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The `channel:chat_id` session key this message belongs to.
    #[must_use]
    pub fn session_key(&self) -> crate::ids::SessionKey {
        crate::ids::SessionKey::new(&self.channel, &self.chat_id)
    }
}

/// A message produced only by the Agent Loop or the Sub-agent Supervisor,
/// destined for delivery back on the originating channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Destination channel.
    pub channel: String,
    /// Destination chat/conversation id.
    pub chat_id: String,
    /// Trace this reply is answering.
    pub trace_id: TraceId,
    /// Task this reply was produced for.
    pub task_id: crate::ids::TaskId,
    /// Reply text.
    pub content: String,
}
