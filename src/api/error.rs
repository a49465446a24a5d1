//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::bookings::BookingDataError;
use crate::chat::ChatError;
use crate::gateway::GatewayError;
use crate::registration::RegistrationError;
use crate::validation::FieldErrors;

/// Structured error response body for the website.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Per-field messages for form submissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, None)
            }
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "Please correct the highlighted fields".to_string(),
                Some(fields),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, None),
            ApiError::NotConfigured(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_CONFIGURED",
                detail,
                None,
            ),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "API upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "UPSTREAM",
                    "The booking service is unavailable".to_string(),
                    None,
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured(what) => {
                ApiError::NotConfigured(format!("{what} is not configured"))
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<BookingDataError> for ApiError {
    fn from(err: BookingDataError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Incomplete(fields) => ApiError::Validation(fields),
            RegistrationError::InvalidStep { errors, .. } => ApiError::Validation(errors),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}
