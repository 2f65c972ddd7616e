//! OpenAI-compatible chat-completions client.
//!
//! The same client serves the answer generator and the grader; only the
//! model and sampling settings differ between the two.

use super::TextGenerator;
use crate::config::LlmConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    // Null when the model refuses or only emits tool calls.
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Token accounting reported by the API.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
}

/// Turn a raw completion body into the first choice.
fn parse_completion(body: &str) -> Result<LlmResponse> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)?;

    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RagError::LlmApi("No choices in response".to_string()))?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: completion.usage,
    })
}

/// Describe a non-success response, preferring the API's own error message.
fn api_failure(status: reqwest::StatusCode, body: &str) -> RagError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => {
            RagError::LlmApi(format!("API error ({}): {}", status, api_error.error.message))
        }
        Err(_) => RagError::LlmApi(format!("Request failed ({}): {}", status, body)),
    }
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/chat/completions", base)
    }

    /// Model this client sends requests to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_failure(status, &body));
        }

        let parsed = parse_completion(&body)?;
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion"
            );
        }
        Ok(parsed)
    }

    /// Convenience method: single user message with optional system prompt.
    pub async fn complete(&self, system: Option<&str>, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(Message::system(sys));
        }
        messages.push(Message::user(user));

        let response = self.chat(&messages).await?;
        if response.finish_reason.as_deref() == Some("length") {
            tracing::warn!(model = %self.config.model, "completion truncated at max_tokens");
        }
        Ok(response.content)
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let reply = self
            .complete(None, "Say 'hello' and nothing else.")
            .await?;

        if reply.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(RagError::LlmApi(format!("Unexpected response: {}", reply)))
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        self.complete(system, prompt).await
    }
}
