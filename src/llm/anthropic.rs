//! Anthropic Messages API client
//!
//! `POST {base}/v1/messages`, authenticated with `x-api-key`. Streaming
//! requests set `stream: true` and decode the server-sent events into text
//! deltas.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};

use super::sse::{SseDecoder, SseFrame};
use super::{Completion, CompletionRequest, LanguageModel, TextStream, Usage};
use crate::config::LlmConfig;
use crate::error::{Result, ServiceError};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_key: &str, config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout,
        })
    }

    fn body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": request.messages,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    fn post(&self, body: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
    }
}

/// Turn a non-2xx response into a provider error carrying status and body
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(ServiceError::Provider(format!(
        "Anthropic API error {}: {}",
        status, text
    )))
}

fn parse_completion(data: &Value, fallback_model: &str) -> Result<Completion> {
    let text = data["content"]
        .as_array()
        .and_then(|blocks| {
            blocks
                .iter()
                .find(|b| b["type"].as_str().map_or(true, |t| t == "text"))
        })
        .and_then(|b| b["text"].as_str())
        .ok_or_else(|| ServiceError::Provider("No text block in Anthropic response".to_string()))?;

    Ok(Completion {
        text: text.to_string(),
        model: data["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        usage: Usage {
            input_tokens: data["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: data["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
        },
    })
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let response = self
            .post(&self.body(request, false))
            .timeout(self.timeout)
            .send()
            .await?;
        let data: Value = check_status(response).await?.json().await?;
        parse_completion(&data, &self.model)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<TextStream> {
        let response = self.post(&self.body(request, true)).send().await?;
        let response = check_status(response).await?;

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(ServiceError::from))
            .boxed();
        Ok(text_deltas(bytes).boxed())
    }
}

enum StreamEvent {
    Text(String),
    Stop,
    Failed(String),
    Ignored,
}

fn interpret(frame: &SseFrame) -> StreamEvent {
    let data: Value = match serde_json::from_str(&frame.data) {
        Ok(data) => data,
        Err(_) => {
            tracing::debug!(event = ?frame.event, "skipping non-JSON stream frame");
            return StreamEvent::Ignored;
        }
    };
    let kind = frame
        .event
        .as_deref()
        .or_else(|| data["type"].as_str())
        .unwrap_or_default();

    match kind {
        "content_block_delta" if data["delta"]["type"] == "text_delta" => {
            match data["delta"]["text"].as_str() {
                Some(text) if !text.is_empty() => StreamEvent::Text(text.to_string()),
                _ => StreamEvent::Ignored,
            }
        }
        "message_stop" => StreamEvent::Stop,
        "error" => StreamEvent::Failed(
            data["error"]["message"]
                .as_str()
                .unwrap_or("unknown stream error")
                .to_string(),
        ),
        _ => StreamEvent::Ignored,
    }
}

struct DeltaState {
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl DeltaState {
    fn fail(&mut self, error: ServiceError) {
        self.pending.push_back(Err(error));
        self.finished = true;
    }
}

/// Decode raw SSE bytes into text deltas, ending at `message_stop` or the
/// first error
pub(crate) fn text_deltas(
    bytes: BoxStream<'static, Result<Vec<u8>>>,
) -> impl futures::Stream<Item = Result<String>> + Send + 'static {
    let state = DeltaState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for frame in state.decoder.push(&chunk) {
                        match interpret(&frame) {
                            StreamEvent::Text(text) => state.pending.push_back(Ok(text)),
                            StreamEvent::Stop => {
                                state.finished = true;
                                break;
                            }
                            StreamEvent::Failed(message) => {
                                state.fail(ServiceError::Provider(message));
                                break;
                            }
                            StreamEvent::Ignored => {}
                        }
                    }
                }
                Some(Err(e)) => state.fail(e),
                None => state.fail(ServiceError::Provider(
                    "stream ended before message_stop".to_string(),
                )),
            }
        }
    })
}
