//! KafClaw LLM — the abstract, non-streaming LLM transport seam (spec §1,
//! §4.6, C7 step 7: `{messages, tools, model, maxTokens=4096,
//! temperature=0.7}` in, an [`LlmResponse`] out).
//!
//! Concrete transports (Claude, OpenAI-compatible, etc.) are an explicit
//! out-of-scope collaborator per spec §1 — this crate defines only the
//! [`provider::LlmProvider`] trait and the message/tool/response types
//! `kafclaw-runtime` drives it with. Grounded on the teacher's
//! `astrid-llm::provider`/`astrid-llm::types`, with streaming stripped:
//! spec §1 names real-time token streaming as an explicit non-goal.

#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use error::{LlmError, LlmResult};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{LlmProvider, ProviderConfig};
pub use types::{
    CompletionParams, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole,
    StopReason, ToolCall, ToolCallResult, Usage,
};
