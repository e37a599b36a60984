//! Content moderation routes

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::{health, traced};
use crate::error::Result;
use crate::moderation::Moderator;
use crate::types::{
    ApiResponse, BatchModerationResults, FilterLevel, ModerateRequest, ModerationCatalog,
    ModerationResult,
};

pub const SERVICE_NAME: &str = "content-moderation";

pub fn router(moderator: Arc<Moderator>) -> Router {
    traced(
        Router::new()
            .route("/health", get(|| async { health(SERVICE_NAME) }))
            .route("/api/moderate", post(moderate))
            .route("/api/moderate/batch", post(moderate_batch))
            .route("/api/categories", get(categories))
            .with_state(moderator),
    )
}

async fn moderate(
    State(moderator): State<Arc<Moderator>>,
    payload: std::result::Result<Json<ModerateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ModerationResult>>> {
    let Json(request) = payload?;
    let level = request
        .filter_level
        .as_deref()
        .map(FilterLevel::parse_lossy)
        .unwrap_or_default();

    let result = moderator.moderate(&request.content, level).await;
    Ok(Json(ApiResponse::ok(result)))
}

/// Body is a bare JSON array of strings
async fn moderate_batch(
    State(moderator): State<Arc<Moderator>>,
    payload: std::result::Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchModerationResults>>> {
    let Json(contents) = payload?;
    let results = moderator.moderate_batch(&contents).await;
    Ok(Json(ApiResponse::ok(BatchModerationResults { results })))
}

async fn categories() -> Json<ApiResponse<ModerationCatalog>> {
    Json(ApiResponse::ok(Moderator::catalog()))
}
