//! Runtime configuration for the three services
//!
//! Binaries parse command-line flags and environment variables with `clap`
//! and convert them into these structs. Defaults match the deployed settings.

use std::time::Duration;

/// Anthropic Messages API settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key; `None` leaves the client unconfigured
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Sampling temperature; `None` uses the provider default
    pub temperature: Option<f32>,
    /// Timeout for non-streaming calls
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 4096,
            temperature: Some(0.8),
            timeout: Duration::from_secs(120),
        }
    }
}

/// AI orchestration service settings
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    pub llm: LlmConfig,
    pub chat_service_url: String,
    pub memory_service_url: String,
    pub moderation_service_url: String,
    /// How many history messages to request from the chat service
    pub history_limit: usize,
    /// How many memories to request for prompt context
    pub memory_limit: usize,
    /// Timeout for sibling-service calls
    pub collaborator_timeout: Duration,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            chat_service_url: "http://localhost:3004".to_string(),
            memory_service_url: "http://localhost:8002".to_string(),
            moderation_service_url: "http://localhost:8003".to_string(),
            history_limit: 20,
            memory_limit: 5,
            collaborator_timeout: Duration::from_secs(10),
        }
    }
}

/// Score cutoffs per filter level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityThresholds {
    pub strict: f64,
    pub moderate: f64,
    pub relaxed: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            strict: 0.3,
            moderate: 0.6,
            relaxed: 0.8,
        }
    }
}

/// Content moderation service settings
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Classifier model settings; the key may be absent
    pub classifier: LlmConfig,
    pub thresholds: SeverityThresholds,
    /// Items beyond this are ignored by batch moderation
    pub max_batch_size: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            classifier: LlmConfig {
                model: "claude-haiku-4-20250514".to_string(),
                max_tokens: 500,
                temperature: None,
                timeout: Duration::from_secs(30),
                ..LlmConfig::default()
            },
            thresholds: SeverityThresholds::default(),
            max_batch_size: 10,
        }
    }
}

/// Embedding backend settings
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Backend: "openai", "tfidf" or "none"
    pub backend: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    /// Expected dimensions (OpenAI) or vector size (tfidf)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            api_key: None,
            base_url: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Memory service settings
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Lifetime of a stored memory record
    pub short_term_ttl: Duration,
    /// Optional cap on retrieval limits; `None` returns up to the
    /// requested limit
    pub max_memories_per_query: Option<usize>,
}

impl MemoryConfig {
    /// The per-conversation index outlives its records by this factor
    pub const INDEX_TTL_FACTOR: u32 = 24;

    pub fn index_ttl(&self) -> Duration {
        self.short_term_ttl * Self::INDEX_TTL_FACTOR
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_ttl: Duration::from_secs(3600),
            max_memories_per_query: None,
        }
    }
}
