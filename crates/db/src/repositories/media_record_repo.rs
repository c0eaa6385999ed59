//! Repository for the `media_records` table.

use async_trait::async_trait;
use gallery_core::error::StorageError;
use gallery_core::media::{MediaRecord, MediaType, MediaUpsert};
use sqlx::PgPool;

use crate::models::media_record::MediaRecordRow;
use crate::store::MediaStore;

/// Column list for `media_records` queries.
const COLUMNS: &str = "\
    id, media_type, model_type, prompt, reference_image, url, thumbnail, \
    details, created_at, updated_at";

/// Stored job states that end a job.
const TERMINAL_STATES: &str = "('Completed', 'Failed')";

/// Provides query operations for media records.
pub struct MediaRecordRepo;

impl MediaRecordRepo {
    // ── Queries ──────────────────────────────────────────────────────

    /// Find a record by id.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<MediaRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_records WHERE id = $1");
        sqlx::query_as::<_, MediaRecordRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List records, optionally filtered by exact media type. Unordered.
    pub async fn list(
        pool: &PgPool,
        media_type: Option<MediaType>,
    ) -> Result<Vec<MediaRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_records \
             WHERE ($1::text IS NULL OR media_type = $1)"
        );
        sqlx::query_as::<_, MediaRecordRow>(&query)
            .bind(media_type.map(MediaType::as_str))
            .fetch_all(pool)
            .await
    }

    /// List VIDEO records whose `details.status` is not terminal.
    pub async fn list_pending_videos(pool: &PgPool) -> Result<Vec<MediaRecordRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_records \
             WHERE media_type = 'VIDEO' \
               AND COALESCE(details->>'status', '') NOT IN {TERMINAL_STATES}"
        );
        sqlx::query_as::<_, MediaRecordRow>(&query)
            .fetch_all(pool)
            .await
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Insert or merge a record in one statement.
    ///
    /// On conflict: `media_type` must match (otherwise no row is returned),
    /// `prompt` is only filled when empty, `reference_image` only when
    /// null, `details` is merged with `||`, other supplied fields
    /// overwrite, absent fields are kept. `created_at` is never touched.
    pub async fn upsert(
        pool: &PgPool,
        upsert: &MediaUpsert,
    ) -> Result<Option<MediaRecordRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO media_records \
                 (id, media_type, model_type, prompt, reference_image, url, thumbnail, \
                  details, created_at, updated_at) \
             VALUES ($1, $2, COALESCE($3, ''), COALESCE($4, ''), $5, $6, $7, \
                     COALESCE($8::jsonb, '{{}}'::jsonb), NOW(), NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
                 model_type = COALESCE($3, media_records.model_type), \
                 prompt = CASE WHEN media_records.prompt = '' \
                               THEN COALESCE($4, '') ELSE media_records.prompt END, \
                 reference_image = COALESCE(media_records.reference_image, $5), \
                 url = COALESCE($6, media_records.url), \
                 thumbnail = COALESCE($7, media_records.thumbnail), \
                 details = CASE WHEN $8::jsonb IS NULL THEN media_records.details \
                                ELSE media_records.details || $8::jsonb END, \
                 updated_at = NOW() \
             WHERE media_records.media_type = EXCLUDED.media_type \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaRecordRow>(&query)
            .bind(&upsert.id)
            .bind(upsert.media_type.as_str())
            .bind(upsert.model_type.as_deref())
            .bind(upsert.prompt.as_deref())
            .bind(upsert.reference_image.as_deref())
            .bind(upsert.url.as_deref())
            .bind(upsert.thumbnail.as_deref())
            .bind(upsert.details.clone())
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// MediaStore implementation
// ---------------------------------------------------------------------------

/// PostgreSQL-backed [`MediaStore`].
#[derive(Debug, Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_records(rows: Vec<MediaRecordRow>) -> Result<Vec<MediaRecord>, StorageError> {
    rows.into_iter().map(MediaRecord::try_from).collect()
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError> {
        MediaRecordRepo::find_by_id(&self.pool, id)
            .await
            .map_err(StorageError::unavailable)?
            .map(MediaRecord::try_from)
            .transpose()
    }

    async fn upsert(&self, upsert: MediaUpsert) -> Result<MediaRecord, StorageError> {
        upsert.validate()?;
        let row = MediaRecordRepo::upsert(&self.pool, &upsert)
            .await
            .map_err(StorageError::unavailable)?
            .ok_or_else(|| {
                tracing::warn!(
                    record_id = %upsert.id,
                    media_type = %upsert.media_type,
                    "Upsert would change media_type, rejected",
                );
                StorageError::Rejected(format!(
                    "media_type of record '{}' cannot become {}",
                    upsert.id, upsert.media_type
                ))
            })?;
        MediaRecord::try_from(row)
    }

    async fn list(&self, media_type: Option<MediaType>) -> Result<Vec<MediaRecord>, StorageError> {
        let rows = MediaRecordRepo::list(&self.pool, media_type)
            .await
            .map_err(StorageError::unavailable)?;
        into_records(rows)
    }

    async fn list_pending_videos(&self) -> Result<Vec<MediaRecord>, StorageError> {
        let rows = MediaRecordRepo::list_pending_videos(&self.pool)
            .await
            .map_err(StorageError::unavailable)?;
        into_records(rows)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        crate::health_check(&self.pool)
            .await
            .map_err(StorageError::unavailable)
    }
}
