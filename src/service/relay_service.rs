use std::sync::Arc;

use axum::http::Method;
use tracing::{error, info};

use crate::completion::CompletionProvider;
use crate::db::TranscriptStore;
use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, MessageRecord};
use crate::validator;

/// Validate → complete → persist, short-circuiting on the first failure.
#[derive(Clone)]
pub struct RelayService {
    completion: Arc<dyn CompletionProvider>,
    store: Arc<dyn TranscriptStore>,
    default_model: String,
}

impl RelayService {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        store: Arc<dyn TranscriptStore>,
        default_model: impl Into<String>,
    ) -> Self {
        Self { completion, store, default_model: default_model.into() }
    }

    /// Runs the whole pipeline for a raw inbound request.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> Result<ChatResponse, AppError> {
        let request = validator::validate(method, body, &self.default_model)?;
        self.relay(request).await
    }

    /// Completion then persistence for an already-validated request.
    ///
    /// The reply is only returned once both records are stored; a store
    /// failure hides an otherwise successful completion from the caller.
    pub async fn relay(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        info!(user_id = %request.user_id, model = %request.model, "Relaying chat message");

        // ── Completion ────────────────────────────────────────────────────────
        let completion = self.completion.complete(&request.message, &request.model).await?;

        // ── Transcript ────────────────────────────────────────────────────────
        let records = MessageRecord::transcript(&request, &completion);
        if let Err(e) = self.store.insert_transcript(&records).await {
            error!(
                user_id = %request.user_id,
                "Reply computed but transcript was not saved: {e}"
            );
            return Err(e);
        }

        Ok(ChatResponse { reply: completion.reply })
    }
}
