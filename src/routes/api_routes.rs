use std::any::Any;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::errors::AppError;
use crate::service::relay_service::RelayService;

pub const CHAT_PATH: &str = "/api/chat";

pub fn router(svc: RelayService) -> Router {
    Router::new()
        .route(CHAT_PATH, any(chat_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(svc)
}

/// `/api/chat` — every method lands here so that the 405 carries the JSON
/// error body and `Allow` header.
pub async fn chat_handler(
    State(svc): State<RelayService>,
    method: Method,
    body: Bytes,
) -> Response {
    match svc.handle(&method, &body).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => {
            // Downstream failures are logged where they happen.
            if err.is_validation() || matches!(err, AppError::MethodNotAllowed { .. }) {
                warn!("Rejected chat request: {err}");
            } else {
                debug!(status = err.status_code().as_u16(), "Chat relay failed: {err}");
            }
            err.into_response()
        }
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Chat handler panicked: {detail}");
    AppError::Internal(detail.to_string()).into_response()
}
