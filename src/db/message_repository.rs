use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::db::TranscriptStore;
use crate::errors::AppError;
use crate::models::MessageRecord;

/// Writes transcripts straight into Postgres.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
    timeout: Duration,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn insert_batch(&self, records: &[MessageRecord]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to open transaction for transcript insert: {e}");
            AppError::persistence(format!("Failed to open transaction: {e}"))
        })?;

        let created_at = Utc::now();
        for record in records {
            sqlx::query(
                "INSERT INTO messages (id, role, message, model, user_id, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::new_v4())
            .bind(record.role.as_str())
            .bind(&record.message)
            .bind(&record.model)
            .bind(&record.user_id)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to insert {} message for user {}: {e}", record.role, record.user_id);
                AppError::persistence(format!("Failed to insert {} message: {e}", record.role))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transcript insert: {e}");
            AppError::persistence(format!("Failed to commit transcript: {e}"))
        })
    }
}

#[async_trait]
impl TranscriptStore for PgMessageRepository {
    async fn insert_transcript(&self, records: &[MessageRecord]) -> Result<(), AppError> {
        // An unfinished transaction is rolled back when the future is dropped.
        tokio::time::timeout(self.timeout, self.insert_batch(records))
            .await
            .map_err(|_| {
                error!("Transcript insert timed out after {:?}", self.timeout);
                AppError::persistence(format!("Insert timed out after {:?}", self.timeout))
            })?
    }
}
