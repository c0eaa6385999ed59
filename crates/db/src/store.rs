//! The store seam shared by the PostgreSQL and in-memory backends.

use async_trait::async_trait;
use gallery_core::error::StorageError;
use gallery_core::media::{MediaRecord, MediaType, MediaUpsert};

/// Key-value-with-attributes storage for media records.
///
/// Implementations must make each single-record upsert atomic. There is no
/// version check: concurrent upserts to the same id are last-writer-wins.
/// `list` makes no ordering promise; callers sort.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Fetch one record. `Ok(None)` when the id is unknown.
    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError>;

    /// Insert the record, or merge the supplied fields into the existing one.
    async fn upsert(&self, upsert: MediaUpsert) -> Result<MediaRecord, StorageError>;

    /// All records, optionally restricted to one media type.
    async fn list(&self, media_type: Option<MediaType>) -> Result<Vec<MediaRecord>, StorageError>;

    /// VIDEO records whose stored job state is not terminal.
    async fn list_pending_videos(&self) -> Result<Vec<MediaRecord>, StorageError> {
        let videos = self.list(Some(MediaType::Video)).await?;
        Ok(videos.into_iter().filter(|r| !r.is_terminal()).collect())
    }

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
