//! Chat orchestration
//!
//! A chat turn moderates the user's message, gathers the conversation,
//! recent history and relevant memories, calls the LLM, then moderates the
//! reply. Streaming turns run the same preparation before any event is sent,
//! so precondition failures surface as ordinary HTTP errors.

pub mod clients;
pub mod prompt;

pub use clients::{
    ChatServiceApi, ChatServiceClient, MemoryApi, MemoryServiceClient, ModerationApi,
    ModerationServiceClient,
};
pub use prompt::{build_messages, system_prompt, DEFAULT_SYSTEM_PROMPT};

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::OrchestrationConfig;
use crate::error::{Result, ServiceError};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::types::{ChatReply, ChatRequest, ReplyMetadata};

/// Replaces a generated reply that fails moderation
pub const REFUSAL: &str = "I apologize, but I cannot provide that response.";

const BLOCKED_MESSAGE: &str = "Message blocked by content moderation";

/// Events buffered between the LLM producer and the SSE consumer
const STREAM_BUFFER: usize = 32;

/// One event of a streamed chat turn
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chunk { content: String },
    Done { content: String, model: String },
    Error { error: String },
}

impl ChatEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Chunk { .. } => "chunk",
            ChatEvent::Done { .. } => "done",
            ChatEvent::Error { .. } => "error",
        }
    }

    /// JSON payload of the SSE event
    pub fn data(&self) -> Value {
        match self {
            ChatEvent::Chunk { content } => json!({ "content": content }),
            ChatEvent::Done { content, model } => json!({
                "content": content,
                "metadata": { "model": model },
            }),
            ChatEvent::Error { error } => json!({ "error": error }),
        }
    }
}

pub struct Orchestrator {
    llm: Option<Arc<dyn LanguageModel>>,
    chat_service: Arc<dyn ChatServiceApi>,
    memory: Arc<dyn MemoryApi>,
    moderation: Arc<dyn ModerationApi>,
    history_limit: usize,
    memory_limit: usize,
}

impl Orchestrator {
    pub fn new(
        llm: Option<Arc<dyn LanguageModel>>,
        chat_service: Arc<dyn ChatServiceApi>,
        memory: Arc<dyn MemoryApi>,
        moderation: Arc<dyn ModerationApi>,
        config: &OrchestrationConfig,
    ) -> Self {
        Self {
            llm,
            chat_service,
            memory,
            moderation,
            history_limit: config.history_limit,
            memory_limit: config.memory_limit,
        }
    }

    /// Wire the orchestrator to its sibling services over HTTP
    pub fn from_config(llm: Option<Arc<dyn LanguageModel>>, config: &OrchestrationConfig) -> Result<Self> {
        let http = clients::http_client(config.collaborator_timeout)?;
        Ok(Self::new(
            llm,
            Arc::new(ChatServiceClient::new(http.clone(), &config.chat_service_url)),
            Arc::new(MemoryServiceClient::new(http.clone(), &config.memory_service_url)),
            Arc::new(ModerationServiceClient::new(http, &config.moderation_service_url)),
            config,
        ))
    }

    pub fn llm_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// Check preconditions and assemble the prompt
    async fn prepare(&self, request: &ChatRequest) -> Result<(Arc<dyn LanguageModel>, CompletionRequest)> {
        let llm = self
            .llm
            .clone()
            .ok_or_else(|| ServiceError::ServiceUnavailable("AI service not configured".to_string()))?;

        let verdict = self.moderation.check(&request.message).await.into_value();
        if !verdict.passed {
            tracing::info!(
                conversation_id = %request.conversation_id,
                flags = verdict.flags.len(),
                "message blocked by moderation"
            );
            return Err(ServiceError::ContentBlocked {
                message: BLOCKED_MESSAGE.to_string(),
                flags: verdict.flags,
            });
        }

        let context = async {
            let conversation = self.chat_service.conversation(&request.conversation_id).await?;
            let history = self
                .chat_service
                .history(&request.conversation_id, self.history_limit)
                .await?;
            Ok::<_, ServiceError>((conversation, history))
        };
        let memories = self.memory.relevant_memories(
            &request.conversation_id,
            &request.message,
            self.memory_limit,
        );
        let (context, memories) = tokio::join!(context, memories);
        let (conversation, history) = context?;
        let memories = memories.into_value();

        tracing::debug!(
            conversation_id = %request.conversation_id,
            history = history.len(),
            memories = memories.len(),
            "chat context assembled"
        );

        let prompt = CompletionRequest::new(
            Some(system_prompt(&conversation)),
            build_messages(&history, &request.message, &memories),
        );
        Ok((llm, prompt))
    }

    /// Generate a complete reply
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let (llm, prompt) = self.prepare(request).await?;

        let completion = llm.complete(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, "Claude API error");
            ServiceError::Upstream("AI service error".to_string())
        })?;

        let mut content = completion.text;
        if !self.moderation.check(&content).await.into_value().passed {
            tracing::info!(conversation_id = %request.conversation_id, "reply replaced after moderation");
            content = REFUSAL.to_string();
        }

        Ok(ChatReply {
            content,
            metadata: ReplyMetadata {
                model: completion.model,
                prompt_tokens: completion.usage.input_tokens,
                completion_tokens: completion.usage.output_tokens,
            },
        })
    }

    /// Stream a reply as chunk events followed by exactly one `done` or
    /// `error` event. The producer stops once the receiver is dropped.
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ReceiverStream<ChatEvent>> {
        let (llm, prompt) = self.prepare(request).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let conversation_id = request.conversation_id.clone();

        tokio::spawn(async move {
            let model = llm.model_name().to_string();
            let failed = || ChatEvent::Error {
                error: "AI service unavailable".to_string(),
            };

            let mut stream = match llm.stream(&prompt).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, %conversation_id, "Claude streaming error");
                    let _ = tx.send(failed()).await;
                    return;
                }
            };

            let mut full = String::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(text) => {
                        full.push_str(&text);
                        if tx.send(ChatEvent::Chunk { content: text }).await.is_err() {
                            tracing::debug!(%conversation_id, "stream consumer went away");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, %conversation_id, "Claude streaming error");
                        let _ = tx.send(failed()).await;
                        return;
                    }
                }
            }

            let _ = tx.send(ChatEvent::Done { content: full, model }).await;
        });

        Ok(ReceiverStream::new(rx))
    }
}
