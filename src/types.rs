//! Core types shared by the orchestration, moderation and memory services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Response envelope
// ============================================================================

/// Success envelope shared by every endpoint: `{success: true, data: ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

// ============================================================================
// Degrade-on-failure results
// ============================================================================

/// Outcome of a non-critical dependency call.
///
/// `Fresh` carries the value the dependency returned. `Fallback` carries the
/// safe default used because the dependency failed, plus the reason, so
/// callers can tell "nothing found" apart from "dependency was down".
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Fresh(T),
    Fallback { value: T, reason: String },
}

impl<T> Fetched<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Fetched::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Fetched::Fresh(value) | Fetched::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Fetched::Fresh(value) | Fetched::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Fetched::Fallback { .. })
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Incoming chat message for the orchestration service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub conversation_id: String,
    pub message: String,
    pub user_id: String,
}

/// Speaker of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message in the prompt sent to the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Character attached to a conversation by the chat service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "systemPrompt", default)]
    pub system_prompt: Option<String>,
}

/// Conversation as returned by the chat service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub character: Character,
}

/// A stored chat message as returned by the chat service.
/// Roles are upper-case there (`USER`, `ASSISTANT`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

/// Token usage and model for a generated reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMetadata {
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Final reply of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    pub metadata: ReplyMetadata,
}

// ============================================================================
// Moderation
// ============================================================================

/// Moderation categories the classifier may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationCategory {
    Violence,
    SelfHarm,
    SexualExplicit,
    HateSpeech,
    Harassment,
    IllegalActivity,
    PersonalInfo,
    Spam,
    /// Anything the classifier reports outside the known set.
    /// Never advertised by the categories endpoint.
    Unknown,
}

impl ModerationCategory {
    /// The advertised categories, in display order
    pub const ALL: [ModerationCategory; 8] = [
        ModerationCategory::Violence,
        ModerationCategory::SelfHarm,
        ModerationCategory::SexualExplicit,
        ModerationCategory::HateSpeech,
        ModerationCategory::Harassment,
        ModerationCategory::IllegalActivity,
        ModerationCategory::PersonalInfo,
        ModerationCategory::Spam,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationCategory::Violence => "violence",
            ModerationCategory::SelfHarm => "self_harm",
            ModerationCategory::SexualExplicit => "sexual_explicit",
            ModerationCategory::HateSpeech => "hate_speech",
            ModerationCategory::Harassment => "harassment",
            ModerationCategory::IllegalActivity => "illegal_activity",
            ModerationCategory::PersonalInfo => "personal_info",
            ModerationCategory::Spam => "spam",
            ModerationCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ModerationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModerationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ModerationCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown moderation category: {}", s))
    }
}

impl<'de> Deserialize<'de> for ModerationCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(ModerationCategory::Unknown))
    }
}

/// Severity of a moderation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or(Severity::Low))
    }
}

/// Caller-selected strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterLevel {
    Strict,
    #[default]
    Moderate,
    Relaxed,
}

impl FilterLevel {
    pub const ALL: [FilterLevel; 3] = [FilterLevel::Strict, FilterLevel::Moderate, FilterLevel::Relaxed];

    /// Parse a filter level by exact name. Anything else, including case or
    /// whitespace variants, is `Moderate`.
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "strict" => FilterLevel::Strict,
            "relaxed" => FilterLevel::Relaxed,
            _ => FilterLevel::Moderate,
        }
    }
}

/// A single moderation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationFlag {
    pub category: ModerationCategory,
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

impl ModerationFlag {
    pub fn new(category: ModerationCategory, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            description: description.into(),
        }
    }
}

/// Verdict for one piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub passed: bool,
    #[serde(default)]
    pub flags: Vec<ModerationFlag>,
    #[serde(default)]
    pub score: f64,
}

impl ModerationResult {
    /// Verdict used when moderation could not be consulted
    pub fn passing() -> Self {
        Self {
            passed: true,
            flags: Vec::new(),
            score: 0.0,
        }
    }
}

/// Body of `POST /api/moderate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateRequest {
    pub content: String,
    #[serde(default)]
    pub filter_level: Option<String>,
}

/// Body of `POST /api/moderate/batch` response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchModerationResults {
    pub results: Vec<ModerationResult>,
}

/// Static enumeration served by `GET /api/categories`
#[derive(Debug, Clone, Serialize)]
pub struct ModerationCatalog {
    pub categories: Vec<ModerationCategory>,
    pub severity_levels: Vec<Severity>,
    pub filter_levels: Vec<FilterLevel>,
}

// ============================================================================
// Memory
// ============================================================================

/// A memory stored in the key-value store under `memory:{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Deterministic id derived from conversation and content hash
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    /// SHA-256 of the content (`sha256:<hex>`)
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(rename = "type", default = "default_memory_type")]
    pub memory_type: String,
    /// Importance score (0.0 - 1.0)
    #[serde(default = "default_importance")]
    pub importance: f32,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A ranked memory returned by retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryView {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub importance: f32,
    pub relevance_score: Option<f32>,
}

/// Body of `POST /api/memory/store`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMemoryRequest {
    pub conversation_id: String,
    pub content: String,
    #[serde(default = "default_memory_type")]
    pub memory_type: String,
    #[serde(default = "default_importance")]
    pub importance: f32,
}

/// Body of `POST /api/memory/retrieve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveMemoryRequest {
    pub conversation_id: String,
    pub query: String,
    #[serde(default = "default_retrieve_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMemory {
    pub id: String,
    pub stored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMemories {
    pub memories: Vec<MemoryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedMemories {
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    pub conversation_id: String,
    pub total_memories: usize,
}

fn default_memory_type() -> String {
    "fact".to_string()
}

fn default_importance() -> f32 {
    0.5
}

fn default_retrieve_limit() -> usize {
    5
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
