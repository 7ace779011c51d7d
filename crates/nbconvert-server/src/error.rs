//! API error types with JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nbconvert_core::RegistryError;
use serde::Serialize;

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// The exporter registry cannot be loaded at all (500).
    #[error("Could not load exporter registry: {0}")]
    RegistryUnavailable(String),

    /// Discovery failed for another reason (500).
    #[error("registry error: {0}")]
    Registry(#[source] RegistryError),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Unavailable(cause) => Self::RegistryUnavailable(cause),
            other => Self::Registry(other),
        }
    }
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::RegistryUnavailable(_) => "REGISTRY_UNAVAILABLE",
            Self::Registry(_) => "REGISTRY_ERROR",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) | Self::RegistryUnavailable(_) | Self::Registry(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Error code (e.g., "UNAUTHORIZED", "REGISTRY_UNAVAILABLE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
