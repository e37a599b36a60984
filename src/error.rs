//! Error types shared by the three services

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::types::ModerationFlag;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the services
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A dependency is unconfigured or unreachable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Content rejected by moderation; the flags are returned to the caller
    #[error("{message}")]
    ContentBlocked {
        message: String,
        flags: Vec<ModerationFlag>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected provider or collaborator failure. The message is what the
    /// caller sees; the cause is logged where the error is raised.
    #[error("{0}")]
    Upstream(String),

    /// LLM or embedding provider failure (status, body or decoding)
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Key-value store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    /// Stable machine-readable code for the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ServiceError::ContentBlocked { .. } => "CONTENT_BLOCKED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::InvalidInput(_) => "INVALID_INPUT",
            _ => "UPSTREAM_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::ContentBlocked { .. } | ServiceError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to API callers. Internal causes (store, HTTP,
    /// serialization) collapse to a generic message.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Provider(_)
            | ServiceError::Store(_)
            | ServiceError::Serialization(_)
            | ServiceError::Http(_) => "Internal service error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for ServiceError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
        {
            ServiceError::ServiceUnavailable(format!("memory store unreachable: {}", e))
        } else {
            ServiceError::Store(e.to_string())
        }
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "request failed: {}", self);
        }

        let mut detail = json!({
            "code": self.code(),
            "message": self.public_message(),
        });
        if let ServiceError::ContentBlocked { flags, .. } = &self {
            detail["flags"] = json!(flags);
        }

        (status, Json(json!({ "success": false, "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModerationCategory, Severity};

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::ServiceUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ServiceError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::Upstream("AI service error".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ServiceError::Store("boom".into()).code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn test_internal_causes_not_leaked() {
        let err = ServiceError::Store("WRONGTYPE Operation against a key".into());
        assert_eq!(err.public_message(), "Internal service error");
    }

    #[tokio::test]
    async fn test_content_blocked_body_carries_flags() {
        let err = ServiceError::ContentBlocked {
            message: "Message blocked by content moderation".into(),
            flags: vec![ModerationFlag::new(
                ModerationCategory::Violence,
                Severity::High,
                "Content matched blocked pattern",
            )],
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["detail"]["code"], "CONTENT_BLOCKED");
        assert_eq!(body["detail"]["flags"][0]["category"], "violence");
    }
}
