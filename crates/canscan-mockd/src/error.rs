//! Mock backend error types and conversions

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Result type for the mock backend
pub type Result<T> = std::result::Result<T, MockError>;

/// Errors returned by mock backend handlers
#[derive(Error, Debug)]
pub enum MockError {
    /// 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 503 Service Unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 500 Internal Server Error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            MockError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            MockError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
            MockError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(error = error_type, %message, "Mock API error");
        } else {
            tracing::debug!(error = error_type, %message, "Mock API client error");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for MockError {
    fn from(err: serde_json::Error) -> Self {
        MockError::Internal(err.to_string())
    }
}
