//! LLM provider trait.
//!
//! Defines the interface any concrete transport (outside this workspace,
//! per spec §1's "concrete LLM transports" exclusion) must implement.
//! Adapted from the teacher's `astrid-llm::LlmProvider`: same shape, minus
//! `stream()`/`StreamEvent`/`StreamBox` — spec §1 names real-time token
//! streaming as an explicit non-goal.

use async_trait::async_trait;

use crate::error::LlmResult;
use crate::types::{CompletionParams, LlmResponse, LlmToolDefinition, Message};

/// LLM provider trait.
///
/// Implementors provide access to language models. `kafclaw-runtime` depends
/// only on this trait; no concrete provider lives in this workspace.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Complete a turn, given the assembled system message, history, and
    /// available tool definitions.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        params: &CompletionParams,
    ) -> LlmResult<LlmResponse>;

    /// Simple text completion (no tools, default params for `model`).
    async fn complete_simple(&self, model: &str, prompt: &str) -> LlmResult<String> {
        let messages = vec![Message::user(prompt)];
        let params = CompletionParams::new(model);
        let response = self.complete(&messages, &[], "", &params).await?;
        Ok(response.message.text().unwrap_or("").to_string())
    }

    /// Count tokens in text (approximate).
    fn count_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }

    /// Get maximum context length.
    fn max_context_length(&self) -> usize;
}

/// Blanket implementation allowing `Box<dyn LlmProvider>` to be used
/// wherever `P: LlmProvider` is required.
#[async_trait]
impl LlmProvider for Box<dyn LlmProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        params: &CompletionParams,
    ) -> LlmResult<LlmResponse> {
        (**self).complete(messages, tools, system, params).await
    }

    fn count_tokens(&self, text: &str) -> usize {
        (**self).count_tokens(text)
    }

    fn max_context_length(&self) -> usize {
        (**self).max_context_length()
    }
}

/// Connection configuration shared by concrete providers.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Override base URL (for compatible/self-hosted endpoints).
    pub base_url: Option<String>,
    /// Override context window size, in tokens.
    pub context_window: Option<usize>,
}

impl ProviderConfig {
    /// Create a new provider configuration.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            context_window: None,
        }
    }

    /// Override the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the context window.
    #[must_use]
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = Some(tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StopReason, Usage};

    struct StubProvider;

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[LlmToolDefinition],
            _system: &str,
            _params: &CompletionParams,
        ) -> LlmResult<LlmResponse> {
            Ok(LlmResponse {
                message: Message::assistant("stub response"),
                has_tool_calls: false,
                stop_reason: StopReason::EndTurn,
                usage: Usage::default(),
            })
        }

        fn max_context_length(&self) -> usize {
            128_000
        }
    }

    #[tokio::test]
    async fn complete_simple_extracts_text() {
        let provider = StubProvider;
        let text = provider.complete_simple("stub-model", "hi").await.unwrap();
        assert_eq!(text, "stub response");
    }

    #[tokio::test]
    async fn boxed_provider_delegates() {
        let boxed: Box<dyn LlmProvider> = Box::new(StubProvider);
        assert_eq!(boxed.name(), "stub");
        assert_eq!(boxed.max_context_length(), 128_000);
    }
}
