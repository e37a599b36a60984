//! Content moderation service
//!
//! Run with: content-moderation --port 8003

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use bostonia::api;
use bostonia::config::{LlmConfig, ModerationConfig, SeverityThresholds};
use bostonia::llm::create_llm;
use bostonia::moderation::Moderator;

#[derive(Parser, Debug)]
#[command(name = "content-moderation")]
#[command(about = "Content safety checks: keyword filters plus an LLM classifier")]
struct Args {
    #[arg(long, env = "PORT", default_value = "8003")]
    port: u16,

    /// Anthropic API key; without it only the keyword filters run
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = "https://api.anthropic.com")]
    anthropic_base_url: String,

    #[arg(long, env = "MODERATION_MODEL", default_value = "claude-haiku-4-20250514")]
    moderation_model: String,

    /// Score threshold for the "strict" filter level
    #[arg(long, env = "SEVERITY_THRESHOLD_LOW", default_value = "0.3")]
    severity_threshold_low: f64,

    /// Score threshold for the "moderate" filter level
    #[arg(long, env = "SEVERITY_THRESHOLD_MEDIUM", default_value = "0.6")]
    severity_threshold_medium: f64,

    /// Score threshold for the "relaxed" filter level
    #[arg(long, env = "SEVERITY_THRESHOLD_HIGH", default_value = "0.8")]
    severity_threshold_high: f64,

    #[arg(long, env = "MAX_BATCH_SIZE", default_value = "10")]
    max_batch_size: usize,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn config(&self) -> ModerationConfig {
        let defaults = ModerationConfig::default();
        ModerationConfig {
            classifier: LlmConfig {
                api_key: self.anthropic_api_key.clone(),
                base_url: self.anthropic_base_url.clone(),
                model: self.moderation_model.clone(),
                timeout: Duration::from_secs(30),
                ..defaults.classifier
            },
            thresholds: SeverityThresholds {
                strict: self.severity_threshold_low,
                moderate: self.severity_threshold_medium,
                relaxed: self.severity_threshold_high,
            },
            max_batch_size: self.max_batch_size,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    bostonia::logging::init(args.log_json);

    let config = args.config();
    let classifier = create_llm(&config.classifier)?;
    let moderator = Moderator::new(classifier, &config);

    tracing::info!(
        version = bostonia::VERSION,
        classifier_configured = moderator.classifier_configured(),
        "Starting Content Moderation Service"
    );

    let router = api::moderation::router(Arc::new(moderator));
    api::serve(router, api::moderation::SERVICE_NAME, args.port).await?;
    Ok(())
}
