//! An `OpenAI`-compatible [`LlmProvider`] (LM Studio, `OpenAI`, vLLM,
//! Ollama's compat endpoint, or any other server speaking the same wire
//! format). Adapted from the teacher's `astrid-llm::openai_compat`, with
//! `stream()` dropped — this crate never streams (spec §1 non-goal) — and
//! `CompletionParams` (model/`max_tokens`/temperature) taken per-call
//! rather than fixed at construction, matching this workspace's
//! [`LlmProvider::complete`] signature.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{LlmError, LlmResult};
use crate::provider::LlmProvider;
use crate::types::{
    CompletionParams, LlmResponse, LlmToolDefinition, Message, MessageContent, MessageRole,
    StopReason, ToolCall, Usage,
};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// `OpenAI`-compatible chat-completions provider.
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    max_context: usize,
}

impl OpenAiCompatProvider {
    /// Build a provider against a custom endpoint (LM Studio, vLLM, a
    /// self-hosted gateway, …). `api_key` is optional since local
    /// endpoints typically don't require one.
    #[must_use]
    pub fn custom(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            max_context: 32_768,
        }
    }

    /// Build a provider against the public `OpenAI` API.
    #[must_use]
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: Some(api_key.into()),
            max_context: 128_000,
        }
    }

    /// Override the max context length reported to callers.
    #[must_use]
    pub fn with_max_context(mut self, max_context: usize) -> Self {
        self.max_context = max_context;
        self
    }

    fn is_local(&self) -> bool {
        let lower = self.base_url.to_lowercase();
        lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        params: &CompletionParams,
    ) -> Value {
        let mut wire_messages = Vec::new();
        if !system.is_empty() {
            wire_messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        wire_messages.extend(messages.iter().map(convert_message));

        let mut request = serde_json::json!({
            "model": params.model,
            "messages": wire_messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stream": false,
        });

        if !tools.is_empty() {
            let wire_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    let mut parameters = t.input_schema.clone();
                    if let Some(obj) = parameters.as_object_mut() {
                        obj.entry("properties").or_insert_with(|| serde_json::json!({}));
                    }
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": parameters,
                        }
                    })
                })
                .collect();
            request["tools"] = Value::Array(wire_tools);
        }

        request
    }
}

fn convert_message(msg: &Message) -> Value {
    let role = match msg.role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    };

    match &msg.content {
        MessageContent::Text(text) => serde_json::json!({"role": role, "content": text}),
        MessageContent::ToolCalls(calls) => {
            let wire_calls: Vec<Value> = calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": serde_json::to_string(&tc.arguments).unwrap_or_default(),
                        }
                    })
                })
                .collect();
            serde_json::json!({"role": "assistant", "content": Value::Null, "tool_calls": wire_calls})
        }
        MessageContent::ToolResult(result) => {
            serde_json::json!({"role": "tool", "tool_call_id": result.call_id, "content": result.content})
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        params: &CompletionParams,
    ) -> LlmResult<LlmResponse> {
        if self.api_key.as_ref().is_none_or(String::is_empty) && !self.is_local() {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "openai-compat".to_string(),
            });
        }

        let request_body = self.build_request(messages, tools, system, params);
        debug!(model = %params.model, base_url = %self.base_url, "openai-compat completion request");

        let mut request = self.client.post(&self.base_url).header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            let mut header = reqwest::header::HeaderValue::try_from(format!("Bearer {api_key}"))
                .map_err(|e| LlmError::ApiRequestFailed(format!("invalid api key characters: {e}")))?;
            header.set_sensitive(true);
            request = request.header("Authorization", header);
        }

        let response = request.json(&request_body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(status, body = %body, "openai-compat error response");
            return Err(LlmError::InvalidResponse(format!("HTTP {status}: {body}")));
        }

        let parsed: WireResponse = response.json().await.map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        let (content, has_tool_calls) = match choice.message.tool_calls {
            Some(calls) if !calls.is_empty() => {
                let mut converted = Vec::with_capacity(calls.len());
                for tc in calls {
                    let arguments: Value = serde_json::from_str(&tc.function.arguments)
                        .map_err(|e| LlmError::InvalidResponse(format!("invalid tool arguments json: {e}")))?;
                    converted.push(ToolCall { id: tc.id, name: tc.function.name, arguments });
                }
                (MessageContent::ToolCalls(converted), true)
            }
            _ => (MessageContent::Text(choice.message.content.unwrap_or_default()), false),
        };

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("length") => StopReason::MaxTokens,
            Some("tool_calls") => StopReason::ToolUse,
            Some("content_filter") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        Ok(LlmResponse {
            message: Message { role: MessageRole::Assistant, content },
            has_tool_calls,
            stop_reason,
            usage: Usage {
                input_tokens: parsed.usage.prompt_tokens,
                output_tokens: parsed.usage.completion_tokens,
            },
        })
    }

    fn max_context_length(&self) -> usize {
        self.max_context
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_context", &self.max_context)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_provider_stores_endpoint() {
        let provider = OpenAiCompatProvider::custom("http://localhost:1234/v1/chat/completions", None);
        assert!(provider.is_local());
        assert_eq!(provider.name(), "openai-compat");
    }

    #[test]
    fn openai_provider_requires_no_local_bypass() {
        let provider = OpenAiCompatProvider::openai("sk-test");
        assert!(!provider.is_local());
        assert_eq!(provider.max_context_length(), 128_000);
    }

    #[test]
    fn build_request_includes_system_and_tools() {
        let provider = OpenAiCompatProvider::custom("http://localhost:1234/v1/chat/completions", None);
        let messages = vec![Message::user("hi")];
        let tools = vec![LlmToolDefinition::new("read_file").with_schema(serde_json::json!({"type": "object"}))];
        let params = CompletionParams::new("local-model");
        let body = provider.build_request(&messages, &tools, "be helpful", &params);

        assert_eq!(body["model"], "local-model");
        assert_eq!(body["stream"], false);
        assert!(body["messages"].as_array().unwrap().len() >= 2);
        assert_eq!(body["tools"][0]["function"]["name"], "read_file");
    }

    #[tokio::test]
    async fn missing_api_key_on_remote_endpoint_errors() {
        let provider = OpenAiCompatProvider::custom("https://example.com/v1/chat/completions", None);
        let params = CompletionParams::new("gpt-test");
        let err = provider.complete(&[], &[], "", &params).await.unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotConfigured { .. }));
    }
}
