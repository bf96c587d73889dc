pub mod message_repository;
pub mod rest_repository;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::MessageRecord;

pub use message_repository::PgMessageRepository;
pub use rest_repository::RestMessageRepository;

/// Append-only sink for transcript records.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Writes `records` as one batch: either all rows land or none do.
    async fn insert_transcript(&self, records: &[MessageRecord]) -> Result<(), AppError>;
}
