//! The explicit per-turn context value (spec §9 Design Notes: "Global
//! active context on the loop ... must be replaced by an explicit
//! `TurnContext` value threaded through `processMessage → runAgentLoop →
//! checkToolPolicy → trackTokens → publish*`. No ambient state.").

use kafclaw_core::{MessageType, SessionKey, TaskId, TraceId};

/// Everything downstream steps of one turn need, passed by value instead
/// of read from shared loop state.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub trace_id: TraceId,
    pub task_id: TaskId,
    pub channel: String,
    pub chat_id: String,
    pub sender_id: String,
    pub message_type: MessageType,
}

impl TurnContext {
    #[must_use]
    pub fn new(
        trace_id: TraceId,
        task_id: TaskId,
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        message_type: MessageType,
    ) -> Self {
        Self {
            trace_id,
            task_id,
            channel: channel.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            message_type,
        }
    }

    #[must_use]
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(&self.channel, &self.chat_id)
    }
}
