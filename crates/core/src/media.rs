//! Media record model.
//!
//! [`MediaRecord`] is the stored view of one generated image or video.
//! [`MediaUpsert`] is the merge payload: fields left as `None` are not
//! touched on an existing record. The merge rules live here so every store
//! implementation applies them identically.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, StorageError};
use crate::job::{JobHandle, JobState, OUTPUT_URI_POINTER};
use crate::types::{MediaId, Timestamp};

/// `details` key holding the job state.
pub const DETAILS_STATUS: &str = "status";
/// `details` key holding the job handle.
pub const DETAILS_INVOCATION_ARN: &str = "invocationArn";
/// `details` key holding the service-reported failure reason.
pub const DETAILS_FAILURE_MESSAGE: &str = "failureMessage";

// ---------------------------------------------------------------------------
// Media type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    /// Stored column value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "IMAGE",
            Self::Video => "VIDEO",
        }
    }
}

impl FromStr for MediaType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IMAGE" => Ok(Self::Image),
            "VIDEO" => Ok(Self::Video),
            other => Err(CoreError::Validation(format!(
                "Unknown media type '{other}'. Must be one of: IMAGE, VIDEO"
            ))),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One generated image or video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: MediaId,
    pub media_type: MediaType,
    pub model_type: String,
    pub prompt: String,
    pub reference_image: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub details: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaRecord {
    /// Job state recorded in `details.status`, if any.
    pub fn job_state(&self) -> Option<JobState> {
        self.details
            .get(DETAILS_STATUS)
            .and_then(|v| v.as_str())
            .and_then(JobState::parse)
    }

    /// True once the stored job state is `Completed` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        self.job_state().is_some_and(JobState::is_terminal)
    }

    /// Rebuild the job handle from `details`. Only the invocation id is
    /// required; the output location is empty when it was not recorded.
    pub fn job_handle(&self) -> Option<JobHandle> {
        let invocation_arn = self.details.get(DETAILS_INVOCATION_ARN)?.as_str()?;
        if invocation_arn.is_empty() {
            return None;
        }
        let output_uri = self
            .details
            .pointer(OUTPUT_URI_POINTER)
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Some(JobHandle {
            invocation_arn: invocation_arn.to_string(),
            output_uri: output_uri.to_string(),
        })
    }

    /// Create a record from an upsert payload for an id that does not exist.
    pub fn from_upsert(upsert: MediaUpsert, now: Timestamp) -> Self {
        Self {
            id: upsert.id,
            media_type: upsert.media_type,
            model_type: upsert.model_type.unwrap_or_default(),
            prompt: upsert.prompt.unwrap_or_default(),
            reference_image: upsert.reference_image,
            url: upsert.url,
            thumbnail: upsert.thumbnail,
            details: upsert
                .details
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge an upsert payload into an existing record.
    ///
    /// `prompt` and `reference_image` are set once: they are only filled in
    /// when the stored value is empty. `details` is merged key by key at the
    /// top level. `created_at` never changes; `updated_at` becomes `now`.
    pub fn merge(&mut self, upsert: MediaUpsert, now: Timestamp) -> Result<(), StorageError> {
        if upsert.media_type != self.media_type {
            return Err(StorageError::Rejected(format!(
                "media_type of record '{}' is {} and cannot become {}",
                self.id, self.media_type, upsert.media_type
            )));
        }

        if let Some(model_type) = upsert.model_type {
            self.model_type = model_type;
        }
        if let Some(prompt) = upsert.prompt {
            if self.prompt.is_empty() {
                self.prompt = prompt;
            }
        }
        if self.reference_image.is_none() {
            self.reference_image = upsert.reference_image;
        }
        if let Some(url) = upsert.url {
            self.url = Some(url);
        }
        if let Some(thumbnail) = upsert.thumbnail {
            self.thumbnail = Some(thumbnail);
        }
        if let Some(details) = upsert.details {
            merge_details(&mut self.details, details);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Shallow JSON merge: top-level keys of `update` overwrite `target`.
///
/// Matches the `jsonb || jsonb` operator used by the PostgreSQL store.
pub fn merge_details(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target.as_object_mut(), update) {
        (Some(existing), serde_json::Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (_, update) => *target = update,
    }
}

// ---------------------------------------------------------------------------
// Upsert payload
// ---------------------------------------------------------------------------

/// Merge payload for [`MediaRecord`]. `id` and `media_type` are required;
/// every other field is optional and left untouched when `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaUpsert {
    pub id: MediaId,
    pub media_type: MediaType,
    pub model_type: Option<String>,
    pub prompt: Option<String>,
    pub reference_image: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl MediaUpsert {
    /// Payload carrying only the identity; chain the `with_*` setters.
    pub fn new(id: impl Into<MediaId>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            media_type,
            model_type: None,
            prompt: None,
            reference_image: None,
            url: None,
            thumbnail: None,
            details: None,
        }
    }

    pub fn with_model_type(mut self, model_type: impl Into<String>) -> Self {
        self.model_type = Some(model_type.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_reference_image(mut self, reference_image: Option<String>) -> Self {
        self.reference_image = reference_image;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Boundary validation applied by every store before writing.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.id.trim().is_empty() {
            return Err(StorageError::Rejected("record id must not be empty".into()));
        }
        if let Some(details) = &self.details {
            if !details.is_object() {
                return Err(StorageError::Rejected(format!(
                    "details of record '{}' must be a JSON object",
                    self.id
                )));
            }
        }
        Ok(())
    }
}
