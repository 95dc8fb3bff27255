//! Bridges `kafclaw-memory`'s [`TextCompressor`] seam to a concrete
//! [`LlmProvider`], the same way [`crate::delivery::TaskDeliverySink`]
//! bridges `kafclaw-scheduler`'s `DeliverySink` to [`kafclaw_bus::OutboundBus`].

use std::sync::Arc;

use async_trait::async_trait;
use kafclaw_llm::{CompletionParams, LlmProvider};
use kafclaw_memory::{MemoryError, MemoryResult, TextCompressor};

/// Drives the Memory Observer/Reflector's compression calls through an
/// [`LlmProvider`]'s simple-text completion.
pub struct LlmTextCompressor {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl LlmTextCompressor {
    /// Build a compressor over `provider`, using `model` for every call.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextCompressor for LlmTextCompressor {
    async fn compress(&self, prompt: &str, input: &str) -> MemoryResult<String> {
        let combined = format!("{prompt}\n\n{input}");
        let params = CompletionParams::new(self.model.clone());
        let messages = [kafclaw_llm::Message::user(combined)];
        let response = self
            .provider
            .complete(&messages, &[], "", &params)
            .await
            .map_err(|e| MemoryError::CompressionFailed(e.to_string()))?;
        Ok(response.message.text().unwrap_or_default().to_string())
    }
}
