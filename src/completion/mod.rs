use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use tracing::{debug, error};

use crate::errors::AppError;
use crate::models::CompletionResult;

/// Produces a reply for a single user message.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, message: &str, model: &str) -> Result<CompletionResult, AppError>;
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 1],
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Decodes a 2xx body into the trimmed reply of the first choice.
///
/// Bodies that are not JSON at all are `UpstreamInvalidResponse`; JSON of the
/// wrong shape (no `choices`, empty `choices`, null content) is
/// `UpstreamFormatError`. An empty reply after trimming is returned as-is.
fn decode_reply(body: &str) -> Result<CompletionResult, AppError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        if e.classify() == Category::Data {
            error!(body = %body, "Completion response has unexpected shape: {e}");
            AppError::UpstreamFormatError { message: e.to_string() }
        } else {
            error!(body = %body, "Failed to parse completion response: {e}");
            AppError::UpstreamInvalidResponse { message: e.to_string() }
        }
    })?;

    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
        error!(body = %body, "Completion response has no choices");
        AppError::UpstreamFormatError { message: "empty choices array".to_string() }
    })?;

    let content = choice.message.content.ok_or_else(|| {
        error!(body = %body, "First completion choice has no content");
        AppError::UpstreamFormatError { message: "first choice has no content".to_string() }
    })?;

    Ok(CompletionResult { reply: content.trim().to_string() })
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    fn unreachable(&self, e: reqwest::Error) -> AppError {
        error!("Completion API request to {} failed: {e}", self.endpoint);
        AppError::UpstreamUnreachable {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionClient {
    async fn complete(&self, message: &str, model: &str) -> Result<CompletionResult, AppError> {
        debug!(model, "Requesting completion");

        let payload = CompletionRequest {
            model,
            messages: [RequestMessage { role: "user", content: message }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Completion API returned an error");
            return Err(AppError::UpstreamError { status: status.as_u16(), body });
        }

        let body = response.text().await.map_err(|e| self.unreachable(e))?;

        let result = decode_reply(&body)?;
        debug!(model, reply_len = result.reply.len(), "Completion received");
        Ok(result)
    }
}
