//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, ErrorKind};
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be decoded or failed field validation.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Domain(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict | ErrorKind::Invalid => StatusCode::BAD_REQUEST,
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
