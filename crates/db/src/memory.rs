//! In-memory media store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use gallery_core::error::StorageError;
use gallery_core::media::{MediaRecord, MediaType, MediaUpsert};
use tokio::sync::RwLock;

use crate::store::MediaStore;

/// Map-backed [`MediaStore`]. The write lock makes each upsert atomic.
#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    records: RwLock<HashMap<String, MediaRecord>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn upsert(&self, upsert: MediaUpsert) -> Result<MediaRecord, StorageError> {
        upsert.validate()?;
        let now = Utc::now();
        let mut records = self.records.write().await;

        match records.get_mut(&upsert.id) {
            Some(existing) => {
                existing.merge(upsert, now)?;
                Ok(existing.clone())
            }
            None => {
                let record = MediaRecord::from_upsert(upsert, now);
                records.insert(record.id.clone(), record.clone());
                Ok(record)
            }
        }
    }

    async fn list(&self, media_type: Option<MediaType>) -> Result<Vec<MediaRecord>, StorageError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| media_type.map_or(true, |t| r.media_type == t))
            .cloned()
            .collect())
    }
}
