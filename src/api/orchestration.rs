//! AI orchestration routes

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde::Serialize;

use super::{health, traced};
use crate::chat::Orchestrator;
use crate::error::Result;
use crate::types::{ApiResponse, ChatReply, ChatRequest};

pub const SERVICE_NAME: &str = "ai-orchestration";

#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub service: &'static str,
    pub llm_configured: bool,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    traced(
        Router::new()
            .route("/health", get(|| async { health(SERVICE_NAME) }))
            .route("/health/ready", get(ready))
            .route("/api/chat", post(chat))
            .route("/api/chat/stream", post(chat_stream))
            .with_state(orchestrator),
    )
}

/// Ready only when an LLM client is configured; no outbound probe
async fn ready(State(orchestrator): State<Arc<Orchestrator>>) -> impl IntoResponse {
    let configured = orchestrator.llm_configured();
    let readiness = Readiness {
        status: if configured { "ready" } else { "not_ready" },
        service: SERVICE_NAME,
        llm_configured: configured,
    };
    let status = if configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ApiResponse {
            success: configured,
            data: readiness,
        }),
    )
}

async fn chat(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatReply>>> {
    let Json(request) = payload?;
    let reply = orchestrator.chat(&request).await?;
    Ok(Json(ApiResponse::ok(reply)))
}

async fn chat_stream(
    State(orchestrator): State<Arc<Orchestrator>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let Json(request) = payload?;
    let events = orchestrator.chat_stream(&request).await?;

    let stream = events.map(|event| {
        Ok(Event::default()
            .event(event.name())
            .data(event.data().to_string()))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
