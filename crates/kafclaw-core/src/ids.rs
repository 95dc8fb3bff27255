//! Identifiers used throughout the agent core.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlation identifier threading one inbound message through every
/// derived LLM call, tool call, policy decision, and audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub Uuid);

impl TraceId {
    /// Create a new random trace id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trace:{}", self.0)
    }
}

/// Identifier for a persisted `AgentTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new random task id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

/// Identifier for a sub-agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Create a new random run id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

/// Short random token identifying an [`ApprovalRequest`](crate::message).
///
/// Deliberately short (unlike the uuid-based ids above) because it is
/// typed back by a human in a chat reply: `approve:<id>` / `deny:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    /// Generate a new short approval token (8 lowercase-alphanumeric chars).
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        let token: String = (0..8)
            .map(|_| {
                let idx = rng.gen_range(0..ALPHABET.len());
                ALPHABET[idx] as char
            })
            .collect();
        Self(token)
    }
}

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `channel:chatID` key identifying a conversation's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub String);

impl SessionKey {
    /// Build a session key from its parts.
    #[must_use]
    pub fn new(channel: &str, chat_id: &str) -> Self {
        Self(format!("{channel}:{chat_id}"))
    }

    /// Split back into `(channel, chat_id)`, if the key has the expected shape.
    #[must_use]
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }

    /// Build a sub-agent session key, isolated from the parent's namespace.
    #[must_use]
    pub fn subagent(label: &str) -> Self {
        Self(format!("subagent:{label}"))
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alias kept for readability at call sites that only care about the chat
/// half of a [`SessionKey`].
pub type ChatKey = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_round_trips() {
        let key = SessionKey::new("whatsapp", "+15551234");
        assert_eq!(key.0, "whatsapp:+15551234");
        assert_eq!(key.split(), Some(("whatsapp", "+15551234")));
    }

    #[test]
    fn subagent_key_is_isolated() {
        let key = SessionKey::subagent("researcher");
        assert!(key.0.starts_with("subagent:"));
    }

    #[test]
    fn approval_id_is_eight_chars() {
        let id = ApprovalId::generate();
        assert_eq!(id.0.len(), 8);
        assert!(id.0.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
