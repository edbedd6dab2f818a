//! # API Error Types
//!
//! Every failure leaves the service as
//!
//! ```json
//! {"error": {"code": "VALIDATION_ERROR", "message": "...", "details": {...}}}
//! ```
//!
//! `details` is set only for rejected certificate input, where it names the
//! offending field so a form can highlight it. Storage failures are logged
//! and reported only as a generic internal error.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use certreg_core::ValidationError;
use certreg_registry::RegistryError;

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Error code, message and optional field details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// `NOT_FOUND`, `VALIDATION_ERROR`, `RATE_LIMITED`, ...
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }

    fn with_details(mut self, details: Option<serde_json::Value>) -> Self {
        self.error.details = details;
        self
    }
}

/// Failure of a request, rendered by [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// No such certificate (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Certificate input rejected by the domain types (422, with details).
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// Request-level rule violated (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Body or query string unreadable (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Body over the size limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Client over its request budget (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Storage or runtime failure (500). Logged, never shown to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Rejected(_) | Self::Validation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Field-level details for rejected certificate input.
    fn details(&self) -> Option<serde_json::Value> {
        let Self::Rejected(err) = self else {
            return None;
        };
        Some(match err {
            ValidationError::Empty { field } => json!({ "field": field }),
            ValidationError::TooLong { field, max, .. } => {
                json!({ "field": field, "max_chars": max })
            }
            ValidationError::UnknownCourse(course) => {
                json!({ "field": "course_name", "value": course })
            }
            ValidationError::InvalidMetadataKey { key, .. } => {
                json!({ "field": "metadata", "key": key })
            }
            ValidationError::TooManyMetadataEntries { max, .. } => {
                json!({ "field": "metadata", "max_entries": max })
            }
            ValidationError::InvalidTimestamp(_) => json!({ "field": "issue_date" }),
            ValidationError::InvalidCertificateId(_) => json!({ "field": "id" }),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody::new(code, message).with_details(self.details());
        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(e) => Self::Rejected(e),
            RegistryError::NotFound(id) => Self::NotFound(format!("certificate {id}")),
            RegistryError::Persistence(e) => Self::Internal(e.to_string()),
        }
    }
}
