//! Bostonia services - AI orchestration, content moderation and
//! conversational memory for character chat
//!
//! Three thin HTTP services share this library:
//! - `ai-orchestration`: moderates, gathers context and calls the LLM
//! - `content-moderation`: regex scan plus LLM classifier
//! - `memory-service`: per-conversation memories in a key-value store,
//!   ranked by embedding similarity

pub mod api;
pub mod chat;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod moderation;
pub mod storage;
pub mod types;

pub use error::{Result, ServiceError};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
