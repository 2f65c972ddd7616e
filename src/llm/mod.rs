//! LLM integration module.
//!
//! Provides the `TextGenerator` capability, an OpenAI-compatible client
//! implementing it, and the prompts used for answering and grading.

mod client;
mod prompts;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::{Prompts, fill_template};

use crate::error::Result;
use async_trait::async_trait;

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<String>;
}

/// Pull a JSON object out of a model response that may wrap it in prose or code fences.
pub fn extract_json(response: &str) -> &str {
    let response = response.trim();

    if let Some(rest) = response.strip_prefix("```") {
        // Skip the fence's language tag line.
        let body = rest.find('\n').map(|n| &rest[n + 1..]).unwrap_or(rest);
        if let Some(end) = body.rfind("```") {
            return body[..end].trim();
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if end > start {
            return &response[start..=end];
        }
    }

    response
}
