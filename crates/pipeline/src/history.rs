//! Read side: the history/gallery listing.

use std::sync::Arc;

use gallery_core::error::CoreError;
use gallery_core::media::{MediaRecord, MediaType};
use gallery_db::MediaStore;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::reconciler::JobReconciler;

/// Listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub media_type: Option<MediaType>,
    /// Reconcile pending videos before reading.
    #[serde(default = "default_sync")]
    pub sync: bool,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            media_type: None,
            sync: default_sync(),
        }
    }
}

fn default_sync() -> bool {
    true
}

pub struct HistoryView {
    store: Arc<dyn MediaStore>,
    reconciler: Arc<JobReconciler>,
}

impl HistoryView {
    pub fn new(store: Arc<dyn MediaStore>, reconciler: Arc<JobReconciler>) -> Self {
        Self { store, reconciler }
    }

    /// Records newest first, optionally filtered by media type.
    ///
    /// With `sync`, pending videos are reconciled first and a failing
    /// sync fails the read.
    pub async fn get_history(&self, query: HistoryQuery) -> Result<Vec<MediaRecord>, PipelineError> {
        if query.sync {
            self.reconciler.sync_all().await.map_err(|e| {
                tracing::error!(error = %e, "Sync before history read failed");
                e
            })?;
        }

        let mut records = self.store.list(query.media_type).await?;
        sort_newest_first(&mut records);
        Ok(records)
    }

    /// One record by id.
    pub async fn get(&self, id: &str) -> Result<MediaRecord, PipelineError> {
        self.store.get(id).await?.ok_or_else(|| {
            CoreError::NotFound {
                entity: "media record",
                id: id.to_string(),
            }
            .into()
        })
    }
}

/// `created_at` descending; ties broken by id so the order is stable.
pub fn sort_newest_first(records: &mut [MediaRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
