//! Memory service routes

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use super::{health, traced};
use crate::error::Result;
use crate::memory::MemoryService;
use crate::types::{
    ApiResponse, ClearedMemories, MemorySummary, RetrieveMemoryRequest, RetrievedMemories,
    StoreMemoryRequest, StoredMemory,
};

pub const SERVICE_NAME: &str = "memory-service";

pub fn router(service: Arc<MemoryService>) -> Router {
    traced(
        Router::new()
            .route("/health", get(|| async { health(SERVICE_NAME) }))
            .route("/api/memory/store", post(store))
            .route("/api/memory/retrieve", post(retrieve))
            .route("/api/memory/:conversation_id", delete(clear))
            .route("/api/memory/:conversation_id/summary", get(summary))
            .with_state(service),
    )
}

async fn store(
    State(service): State<Arc<MemoryService>>,
    payload: std::result::Result<Json<StoreMemoryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<StoredMemory>>> {
    let Json(request) = payload?;
    let stored = service.store_memory(request).await?;
    Ok(Json(ApiResponse::ok(stored)))
}

async fn retrieve(
    State(service): State<Arc<MemoryService>>,
    payload: std::result::Result<Json<RetrieveMemoryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<RetrievedMemories>>> {
    let Json(request) = payload?;
    let memories = service.retrieve(&request).await?;
    Ok(Json(ApiResponse::ok(memories)))
}

async fn clear(
    State(service): State<Arc<MemoryService>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ApiResponse<ClearedMemories>>> {
    let cleared = service.clear(&conversation_id).await?;
    Ok(Json(ApiResponse::ok(cleared)))
}

async fn summary(
    State(service): State<Arc<MemoryService>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ApiResponse<MemorySummary>>> {
    let summary = service.summary(&conversation_id).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
