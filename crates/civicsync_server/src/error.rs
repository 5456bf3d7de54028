//! Map `CivicError` onto HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use civicsync_core::error::CivicError;
use serde_json::json;

/// Handler error. Every API failure renders as `{"error": message}`.
#[derive(Debug)]
pub struct AppError(pub CivicError);

impl From<CivicError> for AppError {
    fn from(e: CivicError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CivicError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(CivicError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if self.0.is_retryable() {
            // Store details stay in the log.
            tracing::error!(error = %self.0, "store failure");
            json!({ "error": "internal server error", "retryable": true })
        } else {
            json!({ "error": self.0.to_string() })
        };

        (status, Json(body)).into_response()
    }
}
