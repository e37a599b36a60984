//! AI orchestration service
//!
//! Run with: ai-orchestration --port 8001

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use bostonia::api;
use bostonia::chat::Orchestrator;
use bostonia::config::{LlmConfig, OrchestrationConfig};
use bostonia::llm::create_llm;

#[derive(Parser, Debug)]
#[command(name = "ai-orchestration")]
#[command(about = "Chat orchestration: moderation, context assembly and LLM replies")]
struct Args {
    #[arg(long, env = "PORT", default_value = "8001")]
    port: u16,

    /// Anthropic API key; without it chat endpoints answer 503
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com")]
    anthropic_base_url: String,

    #[arg(long, env = "CLAUDE_MODEL", default_value = "claude-sonnet-4-20250514")]
    claude_model: String,

    #[arg(long, env = "MAX_TOKENS", default_value = "4096")]
    max_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value = "0.8")]
    temperature: f32,

    /// Timeout for non-streaming LLM calls, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "120")]
    llm_timeout_secs: u64,

    #[arg(long, env = "CHAT_SERVICE_URL", default_value = "http://localhost:3004")]
    chat_service_url: String,

    #[arg(long, env = "MEMORY_SERVICE_URL", default_value = "http://localhost:8002")]
    memory_service_url: String,

    #[arg(long, env = "MODERATION_SERVICE_URL", default_value = "http://localhost:8003")]
    moderation_service_url: String,

    /// Timeout for calls to sibling services, in seconds
    #[arg(long, env = "COLLABORATOR_TIMEOUT_SECS", default_value = "10")]
    collaborator_timeout_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn config(&self) -> OrchestrationConfig {
        OrchestrationConfig {
            llm: LlmConfig {
                api_key: self.anthropic_api_key.clone(),
                base_url: self.anthropic_base_url.clone(),
                model: self.claude_model.clone(),
                max_tokens: self.max_tokens,
                temperature: Some(self.temperature),
                timeout: Duration::from_secs(self.llm_timeout_secs),
            },
            chat_service_url: self.chat_service_url.clone(),
            memory_service_url: self.memory_service_url.clone(),
            moderation_service_url: self.moderation_service_url.clone(),
            collaborator_timeout: Duration::from_secs(self.collaborator_timeout_secs),
            ..OrchestrationConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    bostonia::logging::init(args.log_json);

    let config = args.config();
    let llm = create_llm(&config.llm)?;
    let orchestrator = Orchestrator::from_config(llm, &config)?;

    tracing::info!(
        version = bostonia::VERSION,
        model = %config.llm.model,
        llm_configured = orchestrator.llm_configured(),
        "Starting AI Orchestration Service"
    );

    let router = api::orchestration::router(Arc::new(orchestrator));
    api::serve(router, api::orchestration::SERVICE_NAME, args.port).await?;
    Ok(())
}
