//! Job identity strategies.
//!
//! The pull-based sync only sees the service's job list, so it needs a way
//! to map a job back to the media record it belongs to. The mapping goes
//! through the job's designated output location. How ids are encoded in
//! that location differs between service variants, so the mapping is a
//! trait with two stock implementations.

use regex::Regex;

use crate::error::CoreError;
use crate::naming::VIDEO_OUTPUT_FILE;

/// Derives a media record id from a job's output location.
pub trait JobIdentity: Send + Sync + std::fmt::Debug {
    /// Returns `None` when the location does not identify a record.
    fn record_id(&self, output_uri: &str) -> Option<String>;
}

// ---------------------------------------------------------------------------
// Output key
// ---------------------------------------------------------------------------

/// Uses the object key below the bucket as the record id.
///
/// `s3://bucket/videos/abc123` and `bucket/videos/abc123/output.mp4` both
/// map to `videos/abc123`.
#[derive(Debug, Clone)]
pub struct OutputKeyIdentity {
    output_file: String,
}

impl OutputKeyIdentity {
    pub fn new(output_file: impl Into<String>) -> Self {
        Self {
            output_file: output_file.into(),
        }
    }
}

impl Default for OutputKeyIdentity {
    fn default() -> Self {
        Self::new(VIDEO_OUTPUT_FILE)
    }
}

impl JobIdentity for OutputKeyIdentity {
    fn record_id(&self, output_uri: &str) -> Option<String> {
        let without_scheme = match output_uri.split_once("://") {
            Some((_, rest)) => rest,
            None => output_uri,
        };

        // First path segment is the bucket.
        let (_bucket, key) = without_scheme.split_once('/')?;
        let key = key.trim_matches('/');
        let key = key
            .strip_suffix(self.output_file.as_str())
            .unwrap_or(key)
            .trim_end_matches('/');

        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Regex
// ---------------------------------------------------------------------------

/// Uses the first capture group of a pattern (or the whole match when the
/// pattern has no groups) as the record id.
#[derive(Debug, Clone)]
pub struct RegexIdentity {
    pattern: Regex,
}

impl RegexIdentity {
    pub fn new(pattern: &str) -> Result<Self, CoreError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| CoreError::Validation(format!("Invalid job identity pattern: {e}")))?;
        Ok(Self { pattern })
    }
}

impl JobIdentity for RegexIdentity {
    fn record_id(&self, output_uri: &str) -> Option<String> {
        let captures = self.pattern.captures(output_uri)?;
        let m = captures.get(1).or_else(|| captures.get(0))?;
        if m.as_str().is_empty() {
            None
        } else {
            Some(m.as_str().to_string())
        }
    }
}
