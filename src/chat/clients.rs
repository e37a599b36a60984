//! HTTP clients for the services the orchestrator depends on
//!
//! The chat service is critical: an unknown conversation or a transport
//! failure stops the request. The memory and moderation services are not;
//! their failures degrade to `Fetched::Fallback` and are logged.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, ServiceError};
use crate::types::{Conversation, Fetched, HistoryMessage, ModerationFlag, ModerationResult};

const CONTEXT_FAILED: &str = "Failed to fetch conversation context";
const CONVERSATION_NOT_FOUND: &str = "Conversation not found";

/// Conversation metadata and history
#[async_trait]
pub trait ChatServiceApi: Send + Sync {
    /// Conversation with its character; `NotFound` if it does not resolve
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation>;

    /// The most recent `limit` messages, oldest first
    async fn history(&self, conversation_id: &str, limit: usize) -> Result<Vec<HistoryMessage>>;
}

/// Memory lookup for prompt context
#[async_trait]
pub trait MemoryApi: Send + Sync {
    async fn relevant_memories(
        &self,
        conversation_id: &str,
        query: &str,
        limit: usize,
    ) -> Fetched<Vec<String>>;
}

/// Moderation verdicts for user messages and replies
#[async_trait]
pub trait ModerationApi: Send + Sync {
    async fn check(&self, content: &str) -> Fetched<ModerationResult>;
}

/// Build the shared HTTP client used for sibling-service calls
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

// ============================================================================
// Chat service
// ============================================================================

pub struct ChatServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatServiceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

fn context_failed(e: impl std::fmt::Display) -> ServiceError {
    tracing::error!(error = %e, "Error fetching conversation context");
    ServiceError::Upstream(CONTEXT_FAILED.to_string())
}

/// `{base}/api/conversations/{id}/{rest..}` with the id percent-encoded as a
/// single path segment
fn conversation_url(base: &str, conversation_id: &str, rest: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base).map_err(context_failed)?;
    url.path_segments_mut()
        .map_err(|_| context_failed(format!("chat service URL cannot take a path: {}", base)))?
        .pop_if_empty()
        .extend(["api", "conversations", conversation_id])
        .extend(rest);
    Ok(url)
}

#[async_trait]
impl ChatServiceApi for ChatServiceClient {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let url = conversation_url(&self.base_url, conversation_id, &[])?;
        let response = self.client.get(url).send().await.map_err(context_failed)?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::info!(%conversation_id, status = %response.status(), "conversation lookup failed");
            return Err(ServiceError::NotFound(CONVERSATION_NOT_FOUND.to_string()));
        }

        let body: Value = response.json().await.map_err(context_failed)?;
        if body["success"].as_bool() != Some(true) {
            return Err(ServiceError::NotFound(CONVERSATION_NOT_FOUND.to_string()));
        }
        serde_json::from_value(body["data"].clone()).map_err(context_failed)
    }

    async fn history(&self, conversation_id: &str, limit: usize) -> Result<Vec<HistoryMessage>> {
        let url = conversation_url(&self.base_url, conversation_id, &["messages"])?;
        let response = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(context_failed)?;

        if !response.status().is_success() {
            tracing::warn!(%conversation_id, status = %response.status(), "history unavailable");
            return Ok(Vec::new());
        }

        let body: Value = response.json().await.map_err(context_failed)?;
        let messages = body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| serde_json::from_value(m.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();
        Ok(messages)
    }
}

// ============================================================================
// Memory service
// ============================================================================

pub struct MemoryServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl MemoryServiceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MemoryApi for MemoryServiceClient {
    async fn relevant_memories(
        &self,
        conversation_id: &str,
        query: &str,
        limit: usize,
    ) -> Fetched<Vec<String>> {
        let url = join_url(&self.base_url, "/api/memory/retrieve");
        let request = self.client.post(&url).json(&json!({
            "conversation_id": conversation_id,
            "query": query,
            "limit": limit,
        }));

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Memory service unavailable");
                return Fetched::fallback(Vec::new(), e.to_string());
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(status = %response.status(), "Memory service returned an error");
            return Fetched::fallback(Vec::new(), format!("status {}", response.status()));
        }

        match response.json::<Value>().await {
            Ok(body) => Fetched::Fresh(
                body["data"]["memories"]
                    .as_array()
                    .map(|memories| {
                        memories
                            .iter()
                            .filter_map(|m| m["content"].as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Memory service sent an unreadable body");
                Fetched::fallback(Vec::new(), e.to_string())
            }
        }
    }
}

// ============================================================================
// Moderation service
// ============================================================================

pub struct ModerationServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ModerationServiceClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

/// Read a verdict leniently: a missing `passed` counts as passed
fn parse_verdict(data: &Value) -> ModerationResult {
    let flags: Vec<ModerationFlag> = data["flags"]
        .as_array()
        .map(|flags| {
            flags
                .iter()
                .filter_map(|f| serde_json::from_value(f.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    ModerationResult {
        passed: data["passed"].as_bool().unwrap_or(true),
        flags,
        score: data["score"].as_f64().unwrap_or(0.0),
    }
}

#[async_trait]
impl ModerationApi for ModerationServiceClient {
    async fn check(&self, content: &str) -> Fetched<ModerationResult> {
        let url = join_url(&self.base_url, "/api/moderate");
        let response = match self.client.post(&url).json(&json!({ "content": content })).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Moderation service unavailable");
                return Fetched::fallback(ModerationResult::passing(), e.to_string());
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(status = %response.status(), "Moderation service returned an error");
            return Fetched::fallback(
                ModerationResult::passing(),
                format!("status {}", response.status()),
            );
        }

        match response.json::<Value>().await {
            Ok(body) => match body.get("data") {
                Some(data) => Fetched::Fresh(parse_verdict(data)),
                None => Fetched::Fresh(ModerationResult::passing()),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Moderation service sent an unreadable body");
                Fetched::fallback(ModerationResult::passing(), e.to_string())
            }
        }
    }
}
