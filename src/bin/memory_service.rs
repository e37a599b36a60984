//! Memory service
//!
//! Run with: memory-service --port 8002

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use bostonia::api;
use bostonia::config::{EmbeddingConfig, MemoryConfig};
use bostonia::embedding::create_embedder;
use bostonia::memory::MemoryService;
use bostonia::storage::open_store;

#[derive(Parser, Debug)]
#[command(name = "memory-service")]
#[command(about = "Conversational memory storage and retrieval")]
struct Args {
    #[arg(long, env = "PORT", default_value = "8002")]
    port: u16,

    /// Key-value backend: "redis" or "memory"
    #[arg(long, env = "STORE_BACKEND", default_value = "redis")]
    store_backend: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Embedding backend: "openai", "tfidf" or "none".
    /// Defaults to "openai" when an API key is set, otherwise "none".
    #[arg(long, env = "EMBEDDING_BACKEND")]
    embedding_backend: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value = "1536")]
    embedding_dimensions: usize,

    /// Lifetime of a stored memory, in seconds
    #[arg(long, env = "SHORT_TERM_TTL", default_value = "3600")]
    short_term_ttl: u64,

    /// Cap on the number of memories a retrieve may return; unset means no cap
    #[arg(long, env = "MAX_MEMORIES_PER_QUERY")]
    max_memories_per_query: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn embedding_config(&self) -> EmbeddingConfig {
        let has_key = self.openai_api_key.as_deref().is_some_and(|k| !k.is_empty());
        let backend = self
            .embedding_backend
            .clone()
            .unwrap_or_else(|| if has_key { "openai" } else { "none" }.to_string());

        EmbeddingConfig {
            backend,
            api_key: self.openai_api_key.clone(),
            base_url: self.openai_base_url.clone(),
            model: self.embedding_model.clone(),
            dimensions: self.embedding_dimensions,
        }
    }

    fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            short_term_ttl: Duration::from_secs(self.short_term_ttl.max(1)),
            max_memories_per_query: self.max_memories_per_query,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    bostonia::logging::init(args.log_json);

    let embedding_config = args.embedding_config();
    let embedder = create_embedder(&embedding_config)?;

    // A store that cannot be opened leaves the service up, answering 503
    let store = match open_store(&args.store_backend, &args.redis_url) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(backend = %args.store_backend, error = %e, "Memory store connection failed");
            None
        }
    };

    tracing::info!(
        version = bostonia::VERSION,
        store = store.as_ref().map_or("none", |s| s.backend_name()),
        embeddings = %embedding_config.backend,
        "Starting Memory Service"
    );

    let service = MemoryService::new(store, embedder, args.memory_config());
    let router = api::memory::router(Arc::new(service));
    api::serve(router, api::memory::SERVICE_NAME, args.port).await?;
    Ok(())
}
