//! Asynchronous generation job model.
//!
//! The model service reports job status with the spellings `InProgress`,
//! `Completed` and `Failed`; [`JobState`] serializes to exactly those so
//! the raw service payload and our typed view never disagree.

use serde::{Deserialize, Serialize};

use crate::media::{DETAILS_FAILURE_MESSAGE, DETAILS_INVOCATION_ARN, DETAILS_STATUS};

/// JSON pointer to the output location inside a job payload.
pub const OUTPUT_URI_POINTER: &str = "/outputDataConfig/s3OutputDataConfig/s3Uri";

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Remote state of an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    /// Wire spelling used by the model service and stored in `details.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Parse the service spelling. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "InProgress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// `Completed` and `Failed` are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            Self::InProgress => next != Self::InProgress,
            Self::Completed | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Handle / status
// ---------------------------------------------------------------------------

/// Opaque handle returned by the service on asynchronous submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    /// Service-assigned job identifier.
    pub invocation_arn: String,
    /// Designated output location (e.g. `s3://bucket/videos/abc123`).
    pub output_uri: String,
}

/// One status observation for a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub invocation_arn: String,
    pub state: JobState,
    pub output_uri: Option<String>,
    pub failure_message: Option<String>,
    /// Full service payload, written into the record's `details`.
    pub raw: serde_json::Value,
}

impl JobStatus {
    /// Build a typed status from a raw service payload.
    ///
    /// Requires `invocationArn` and a known `status`; the output location
    /// and failure message are optional.
    pub fn from_raw(raw: serde_json::Value) -> Result<Self, String> {
        let invocation_arn = raw
            .get(DETAILS_INVOCATION_ARN)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("missing '{DETAILS_INVOCATION_ARN}' in job payload"))?
            .to_string();

        let status = raw
            .get(DETAILS_STATUS)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("missing '{DETAILS_STATUS}' in job payload"))?;
        let state = JobState::parse(status).ok_or_else(|| format!("unknown job status '{status}'"))?;

        let output_uri = raw
            .pointer(OUTPUT_URI_POINTER)
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let failure_message = raw
            .get(DETAILS_FAILURE_MESSAGE)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(Self {
            invocation_arn,
            state,
            output_uri,
            failure_message,
            raw,
        })
    }
}

/// Optional filter for bulk status queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    pub status: Option<JobState>,
    pub max_results: Option<u32>,
}
