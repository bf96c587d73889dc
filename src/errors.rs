use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::models::ErrorBody;
use crate::validator::ALLOWED_METHODS;

/// Every way a relay request can fail.
///
/// The `Display` output carries diagnostic detail and is only ever logged;
/// the body sent to the caller comes from [`AppError::public_message`].
#[derive(Debug, Error)]
pub enum AppError {
    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Method '{method}' not allowed")]
    MethodNotAllowed { method: String },

    #[error("Field '{field_name}' is missing or empty")]
    MissingField { field_name: String },

    #[error("Request body is not valid JSON: {message}")]
    MalformedBody { message: String },

    // ── Completion API errors ────────────────────────────────────────────────
    #[error("Completion API unreachable at {endpoint}: {message}")]
    UpstreamUnreachable { endpoint: String, message: String },

    #[error("Completion API returned a non-JSON body: {message}")]
    UpstreamInvalidResponse { message: String },

    #[error("Completion API response missing expected structure: {message}")]
    UpstreamFormatError { message: String },

    #[error("Completion API returned status {status}: {body}")]
    UpstreamError { status: u16, body: String },

    // ── Persistence errors ───────────────────────────────────────────────────
    #[error("Failed to persist transcript: {message}")]
    PersistenceError { message: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn missing_field(field_name: impl Into<String>) -> Self {
        AppError::MissingField { field_name: field_name.into() }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        AppError::PersistenceError { message: message.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::MissingField { .. } | AppError::MalformedBody { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            e if e.is_validation() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short category returned to the caller. Never includes upstream payloads.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::MethodNotAllowed { .. } => "Method Not Allowed",
            AppError::MissingField { .. } => "Missing required fields",
            AppError::MalformedBody { .. } => "Invalid JSON body",
            AppError::UpstreamUnreachable { .. } => "Completion API unreachable",
            AppError::UpstreamInvalidResponse { .. } => "Invalid completion response",
            AppError::UpstreamFormatError { .. } => "Unexpected completion response format",
            AppError::UpstreamError { .. } => "Completion API error",
            AppError::PersistenceError { .. } => "Failed to save messages",
            AppError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.public_message().to_string() };
        let mut resp = (self.status_code(), Json(body)).into_response();
        if let AppError::MethodNotAllowed { .. } = self {
            let allow = ALLOWED_METHODS
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                resp.headers_mut().insert(header::ALLOW, value);
            }
        }
        resp
    }
}
