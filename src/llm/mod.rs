//! LLM provider seam
//!
//! The orchestration service generates replies and the moderation service
//! classifies content through `LanguageModel`. The production implementation
//! talks to the Anthropic Messages API; tests substitute scripted fakes.

mod anthropic;
#[cfg(test)]
pub(crate) mod scripted;
pub mod sse;

pub use anthropic::AnthropicClient;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::types::PromptMessage;

/// Incremental text deltas of a streamed completion. The stream ends after
/// the provider's stop event; an `Err` item is always the last one.
pub type TextStream = BoxStream<'static, Result<String>>;

/// A prompt: optional system instructions plus the message list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<PromptMessage>,
}

impl CompletionRequest {
    pub fn new(system: Option<String>, messages: Vec<PromptMessage>) -> Self {
        Self { system, messages }
    }

    /// A single user turn with no system prompt
    pub fn single(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            messages: vec![PromptMessage::user(prompt)],
        }
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A finished, non-streamed completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

/// Trait for chat-completion providers
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier sent with each request
    fn model_name(&self) -> &str;

    /// Generate a full reply
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Generate a reply as a stream of text deltas. Errors before the first
    /// byte are returned directly; later failures arrive as a final `Err`.
    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream>;
}

/// Create an LLM client from configuration; `None` when no API key is set
pub fn create_llm(config: &LlmConfig) -> Result<Option<Arc<dyn LanguageModel>>> {
    match config.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(api_key) => Ok(Some(Arc::new(AnthropicClient::new(api_key, config)?))),
        None => {
            tracing::warn!(model = %config.model, "ANTHROPIC_API_KEY not set; LLM client disabled");
            Ok(None)
        }
    }
}
