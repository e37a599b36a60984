//! Conversational memory: store, rank, clear and count memories per
//! conversation.
//!
//! Layout in the key-value store:
//! - `memory:{id}`: JSON `MemoryRecord`, expires after the record TTL
//! - `memory_index:{conversation_id}`: set of ids, expires after 24x the
//!   record TTL
//!
//! The index outlives its records, so it may name ids whose records have
//! expired. Retrieval skips those; the summary still counts them.

mod ranking;

pub use ranking::rank;

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::embedding::Embedder;
use crate::error::{Result, ServiceError};
use crate::storage::KeyValueStore;
use crate::types::{
    ClearedMemories, Fetched, MemoryRecord, MemorySummary, RetrieveMemoryRequest,
    RetrievedMemories, StoreMemoryRequest, StoredMemory,
};

/// Namespace for memory ids (UUIDv5)
pub const MEMORY_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a9e_4b7d_5e30_9a8f_1c2d_3e4f_5a6b);

const UNAVAILABLE: &str = "Memory service unavailable";

/// SHA-256 of the exact content, `sha256:<hex>`
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Deterministic id for a memory: identical content in the same
/// conversation always maps to the same id
pub fn memory_id(conversation_id: &str, content_hash: &str) -> String {
    let name = format!("{}\n{}", conversation_id, content_hash);
    Uuid::new_v5(&MEMORY_ID_NAMESPACE, name.as_bytes()).to_string()
}

fn record_key(id: &str) -> String {
    format!("memory:{}", id)
}

fn index_key(conversation_id: &str) -> String {
    format!("memory_index:{}", conversation_id)
}

/// Keep connectivity failures as 503 and hide every other store failure
/// behind `message`
fn operation_failed(error: ServiceError, message: &str) -> ServiceError {
    match error {
        ServiceError::ServiceUnavailable(cause) => {
            tracing::warn!(%cause, "{}", message);
            ServiceError::ServiceUnavailable(UNAVAILABLE.to_string())
        }
        ServiceError::InvalidInput(_) => error,
        other => {
            tracing::error!(error = %other, "{}", message);
            ServiceError::Upstream(message.to_string())
        }
    }
}

fn validate(request: &StoreMemoryRequest) -> Result<()> {
    if request.conversation_id.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "conversation_id must not be empty".to_string(),
        ));
    }
    if request.content.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "content must not be empty".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&request.importance) {
        return Err(ServiceError::InvalidInput(format!(
            "importance must be between 0 and 1, got {}",
            request.importance
        )));
    }
    Ok(())
}

pub struct MemoryService {
    store: Option<Arc<dyn KeyValueStore>>,
    embedder: Option<Arc<dyn Embedder>>,
    config: MemoryConfig,
}

impl MemoryService {
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        embedder: Option<Arc<dyn Embedder>>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn store(&self) -> Result<&dyn KeyValueStore> {
        self.store
            .as_deref()
            .ok_or_else(|| ServiceError::ServiceUnavailable(UNAVAILABLE.to_string()))
    }

    /// Best-effort embedding; `Fresh(None)` when no embedder is configured
    async fn embed(&self, text: &str) -> Fetched<Option<Vec<f32>>> {
        let Some(embedder) = &self.embedder else {
            return Fetched::Fresh(None);
        };
        match embedder.embed(text).await {
            Ok(embedding) => Fetched::Fresh(Some(embedding)),
            Err(e) => {
                tracing::warn!(error = %e, model = embedder.model_name(), "Embedding error");
                Fetched::fallback(None, e.to_string())
            }
        }
    }

    /// Store a memory and add it to its conversation's index
    pub async fn store_memory(&self, request: StoreMemoryRequest) -> Result<StoredMemory> {
        validate(&request)?;
        let store = self.store()?;

        let hash = content_hash(&request.content);
        let id = memory_id(&request.conversation_id, &hash);
        let embedding = self.embed(&request.content).await.into_value();

        let record = MemoryRecord {
            id: id.clone(),
            conversation_id: request.conversation_id,
            content: request.content,
            content_hash: Some(hash),
            memory_type: request.memory_type,
            importance: request.importance,
            embedding,
            created_at: Some(Utc::now()),
        };

        let message = "Failed to store memory";
        let json = serde_json::to_string(&record).map_err(|e| operation_failed(e.into(), message))?;
        let index = index_key(&record.conversation_id);

        async {
            store
                .set_ex(&record_key(&id), &json, self.config.short_term_ttl)
                .await?;
            store.sadd(&index, &id).await?;
            store.expire(&index, self.config.index_ttl()).await
        }
        .await
        .map_err(|e| operation_failed(e, message))?;

        tracing::debug!(
            memory_id = %id,
            conversation_id = %record.conversation_id,
            embedded = record.embedding.is_some(),
            "memory stored"
        );
        Ok(StoredMemory { id, stored: true })
    }

    /// Load every live record indexed for a conversation. Missing and
    /// undecodable records are skipped.
    async fn load_records(&self, store: &dyn KeyValueStore, conversation_id: &str) -> Result<Vec<MemoryRecord>> {
        let ids = store.smembers(&index_key(conversation_id)).await?;
        let keys: Vec<String> = ids.iter().map(|id| record_key(id)).collect();
        let values =
            futures::future::try_join_all(keys.iter().map(|key| store.get(key))).await?;

        let mut records = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(json) = value else {
                tracing::debug!(%key, "skipping expired memory");
                continue;
            };
            match serde_json::from_str::<MemoryRecord>(&json) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(%key, error = %e, "skipping undecodable memory"),
            }
        }
        Ok(records)
    }

    /// Retrieve the most relevant memories for a query
    pub async fn retrieve(&self, request: &RetrieveMemoryRequest) -> Result<RetrievedMemories> {
        let store = self.store()?;
        let records = self
            .load_records(store, &request.conversation_id)
            .await
            .map_err(|e| operation_failed(e, "Failed to retrieve memories"))?;

        if records.is_empty() {
            return Ok(RetrievedMemories {
                memories: Vec::new(),
            });
        }

        let limit = match self.config.max_memories_per_query {
            Some(cap) => request.limit.min(cap),
            None => request.limit,
        };
        let query = self.embed(&request.query).await.into_value();
        let memories = rank(records, query.as_deref(), limit);

        Ok(RetrievedMemories { memories })
    }

    /// Delete every memory of a conversation; returns the index size before
    /// deletion
    pub async fn clear(&self, conversation_id: &str) -> Result<ClearedMemories> {
        let store = self.store()?;
        let message = "Failed to clear memories";
        let index = index_key(conversation_id);
        let ids = store
            .smembers(&index)
            .await
            .map_err(|e| operation_failed(e, message))?;

        for id in &ids {
            if let Err(e) = store.delete(&record_key(id)).await {
                tracing::warn!(memory_id = %id, error = %e, "failed to delete memory");
            }
        }
        store
            .delete(&index)
            .await
            .map_err(|e| operation_failed(e, message))?;

        tracing::info!(%conversation_id, cleared = ids.len(), "memories cleared");
        Ok(ClearedMemories { cleared: ids.len() })
    }

    /// Number of indexed memories, including ones whose records expired
    pub async fn summary(&self, conversation_id: &str) -> Result<MemorySummary> {
        let store = self.store()?;
        let ids = store
            .smembers(&index_key(conversation_id))
            .await
            .map_err(|e| operation_failed(e, "Failed to get memory summary"))?;

        Ok(MemorySummary {
            conversation_id: conversation_id.to_string(),
            total_memories: ids.len(),
        })
    }
}
