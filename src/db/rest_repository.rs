use std::time::Duration;

use async_trait::async_trait;
use tracing::error;

use crate::db::TranscriptStore;
use crate::errors::AppError;
use crate::models::MessageRecord;

const MESSAGES_TABLE: &str = "messages";

/// Writes transcripts through a PostgREST endpoint (e.g. Supabase) using a
/// service-role key. A bulk insert is a single statement, so the pair is
/// written atomically.
#[derive(Clone)]
pub struct RestMessageRepository {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
}

impl RestMessageRepository {
    pub fn new(
        base_url: &str,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{MESSAGES_TABLE}", base_url.trim_end_matches('/')),
            service_key: service_key.into(),
        })
    }
}

#[async_trait]
impl TranscriptStore for RestMessageRepository {
    async fn insert_transcript(&self, records: &[MessageRecord]) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "return=minimal")
            .json(records)
            .send()
            .await
            .map_err(|e| {
                error!("Transcript insert request to {} failed: {e}", self.endpoint);
                AppError::persistence(format!("Store unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Store rejected transcript insert");
            return Err(AppError::persistence(format!("Store returned status {status}")));
        }
        Ok(())
    }
}
