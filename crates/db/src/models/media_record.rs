//! Row model for the `media_records` table.

use gallery_core::error::StorageError;
use gallery_core::media::{MediaRecord, MediaType};
use gallery_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `media_records` table.
///
/// `media_type` is stored as text and parsed into [`MediaType`] when the
/// row is converted into a [`MediaRecord`].
#[derive(Debug, Clone, FromRow)]
pub struct MediaRecordRow {
    pub id: String,
    pub media_type: String,
    pub model_type: String,
    pub prompt: String,
    pub reference_image: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub details: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MediaRecordRow> for MediaRecord {
    type Error = StorageError;

    fn try_from(row: MediaRecordRow) -> Result<Self, Self::Error> {
        let media_type = row
            .media_type
            .parse::<MediaType>()
            .map_err(StorageError::unavailable)?;

        Ok(MediaRecord {
            id: row.id,
            media_type,
            model_type: row.model_type,
            prompt: row.prompt,
            reference_image: row.reference_image,
            url: row.url,
            thumbnail: row.thumbnail,
            details: row.details,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
