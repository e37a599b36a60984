//! HTTP surface of the three services
//!
//! Each service gets its own `Router`; the binaries bind them to a port with
//! `serve`. Successful responses use the `{success, data}` envelope, errors
//! go through `ServiceError`'s `IntoResponse`.

pub mod memory;
pub mod moderation;
pub mod orchestration;

use std::net::SocketAddr;

use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::types::ApiResponse;

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
}

/// Liveness payload shared by every service
pub fn health(service: &'static str) -> Json<ApiResponse<Health>> {
    Json(ApiResponse::ok(Health {
        status: "healthy",
        service,
    }))
}

/// Attach request tracing to a service router
pub fn traced(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http())
}

/// Bind `0.0.0.0:{port}` and serve until the process exits
pub async fn serve(router: Router, service: &str, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%service, "listening on {}", addr);
    axum::serve(listener, router).await
}
