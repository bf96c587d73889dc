use axum::http::Method;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatRequestBody};

/// Methods the relay endpoint accepts, advertised in the `Allow` header on 405.
pub const ALLOWED_METHODS: &[Method] = &[Method::POST];

/// Checks the method and required fields of an inbound relay request.
///
/// The body must be a JSON object. `message` and `user_id` must be present
/// and non-empty; whitespace counts as content. `model` falls back to
/// `default_model` when absent or blank.
pub fn validate(method: &Method, body: &[u8], default_model: &str) -> Result<ChatRequest, AppError> {
    if !ALLOWED_METHODS.contains(method) {
        return Err(AppError::MethodNotAllowed { method: method.to_string() });
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::MalformedBody { message: e.to_string() })?;
    if !value.is_object() {
        return Err(AppError::MalformedBody { message: "body is not a JSON object".to_string() });
    }
    let raw: ChatRequestBody = serde_json::from_value(value)
        .map_err(|e| AppError::MalformedBody { message: e.to_string() })?;

    let message = required(raw.message, "message")?;
    let user_id = required(raw.user_id, "user_id")?;
    let model = raw
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default_model.to_string());

    Ok(ChatRequest { message, model, user_id })
}

fn required(value: Option<String>, field_name: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::missing_field(field_name)),
    }
}
