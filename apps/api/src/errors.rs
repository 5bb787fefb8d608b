use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::document::DocumentError;
use crate::export::ExportError;
use crate::llm_client::LlmError;
use crate::session::TranscriptError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    UnknownRound(#[from] TranscriptError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnknownRound(e) => (StatusCode::CONFLICT, "UNKNOWN_ROUND", e.to_string()),
            AppError::Document(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "DOCUMENT_ERROR",
                e.to_string(),
            ),
            AppError::Llm(e) => {
                let (status, code) = match e {
                    LlmError::Throttled { .. } => (StatusCode::TOO_MANY_REQUESTS, "THROTTLED"),
                    LlmError::RateLimited { .. } => {
                        (StatusCode::TOO_MANY_REQUESTS, "UPSTREAM_RATE_LIMITED")
                    }
                    LlmError::Overloaded { .. } => {
                        (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_OVERLOADED")
                    }
                    LlmError::Failed { .. } => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
                };
                (status, code, e.to_string())
            }
            AppError::Export(e) => {
                tracing::error!("Export error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXPORT_ERROR",
                    "The transcript could not be exported".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }

    fn body(&self) -> (StatusCode, Value) {
        let (status, code, message) = self.parts();
        let mut error = json!({
            "code": code,
            "message": message
        });
        if let AppError::Llm(LlmError::Throttled {
            remaining_wait_seconds,
        }) = self
        {
            error["retry_after_seconds"] = json!(remaining_wait_seconds);
        }
        (status, json!({ "error": error }))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Llm(e) = &self {
            tracing::warn!("API call sequence failed: {e}");
        }
        let (status, body) = self.body();
        (status, Json(body)).into_response()
    }
}
