//! API error type with HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Everything a handler can fail with. Each variant maps to a status
/// code and a `{"error": ...}` JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("question is required")]
    MissingQuestion,

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("knowledge graph not loaded")]
    GraphNotLoaded,

    #[error("model request failed: {0}")]
    Model(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingQuestion => StatusCode::BAD_REQUEST,
            ApiError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::GraphNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Model(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(%status, "request failed: {}", self);
        } else {
            tracing::debug!(%status, "request rejected: {}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
