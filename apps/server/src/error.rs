//! Error handling for the HTTP surface of the session server
//!
//! WebSocket traffic never surfaces errors to clients; this type covers the
//! status and health routes, mapped to HTTP responses via `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for client-side handling
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// Main API error type
#[derive(Error, Debug)]
pub enum ApiError {
    // ========== Resource Errors ==========
    /// Requested resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    // ========== Validation Errors ==========
    /// Invalid path parameter
    #[error("invalid path parameter '{name}': {reason}")]
    InvalidPathParam { name: &'static str, reason: String },
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidPathParam { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code string for client-side handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidPathParam { .. } => "INVALID_PATH_PARAM",
        }
    }

    /// Create a not found error for a specific resource
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// Create an invalid path parameter error
    pub fn invalid_path_param(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidPathParam {
            name,
            reason: reason.into(),
        }
    }

    /// Log the rejected request; every variant is a client error
    pub fn log(&self) {
        tracing::debug!(
            error = %self,
            code = self.error_code(),
            status = self.status_code().as_u16(),
            "Client error"
        );
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let error_response = ErrorResponse {
            code: self.error_code(),
            message: self.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
