//! Embedding generation for memory ranking
//!
//! Supports multiple embedding backends:
//! - OpenAI API (text-embedding-3-small) and OpenAI-compatible endpoints
//! - TF-IDF hashing embedder (no external dependencies)
//!
//! Embeddings are best-effort: the memory service stores and ranks without
//! them when no backend is configured or a call fails.

mod tfidf;

pub use tfidf::TfIdfEmbedder;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EmbeddingConfig;
use crate::error::{Result, ServiceError};

/// Trait for embedding generators
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// OpenAI embedding client
///
/// Supports OpenAI, OpenRouter, Azure OpenAI, and other OpenAI-compatible APIs.
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with custom settings
    ///
    /// # Arguments
    /// * `api_key` - API key for authentication
    /// * `base_url` - API base URL (e.g., "https://openrouter.ai/api/v1" for OpenRouter)
    /// * `model` - Model name (e.g., "text-embedding-3-small")
    /// * `dimensions` - Expected embedding dimensions (must match model output)
    pub fn with_config(
        api_key: String,
        base_url: Option<String>,
        model: Option<String>,
        dimensions: Option<usize>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimensions: dimensions.unwrap_or(1536),
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "input": text,
                "model": self.model,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::Provider(format!(
                "Embedding API error {}: {}",
                status, text
            )));
        }

        let data: serde_json::Value = response.json().await?;
        let embedding: Vec<f32> = data["data"][0]["embedding"]
            .as_array()
            .ok_or_else(|| ServiceError::Provider("Invalid embedding response format".to_string()))?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if embedding.len() != self.dimensions {
            return Err(ServiceError::Provider(format!(
                "Embedding dimensions mismatch: expected {}, got {}. Set EMBEDDING_DIMENSIONS={} to match your model.",
                self.dimensions,
                embedding.len(),
                embedding.len()
            )));
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create an embedder from configuration
///
/// - `"openai"`: requires an API key; without one the service runs unembedded
/// - `"tfidf"`: always available, no external dependencies
/// - `"none"`: no embeddings, retrieval ranks by importance
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Option<Arc<dyn Embedder>>> {
    match config.backend.as_str() {
        "openai" => match config.api_key.clone().filter(|k| !k.is_empty()) {
            Some(api_key) => Ok(Some(Arc::new(OpenAIEmbedder::with_config(
                api_key,
                config.base_url.clone(),
                Some(config.model.clone()),
                Some(config.dimensions),
            )))),
            None => {
                tracing::warn!("OPENAI_API_KEY not set; memories will be stored without embeddings");
                Ok(None)
            }
        },
        "tfidf" => Ok(Some(Arc::new(TfIdfEmbedder::new(config.dimensions)))),
        "none" => Ok(None),
        other => Err(ServiceError::InvalidInput(format!(
            "Unknown embedding backend: '{}'. Use 'openai', 'tfidf' or 'none'",
            other
        ))),
    }
}

/// Cosine similarity between two vectors
///
/// The dot product runs over the common prefix; each norm covers its whole
/// vector. A zero norm on either side yields 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
