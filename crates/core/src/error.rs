//! Error taxonomy.
//!
//! Store and object-store failures surface as [`StorageError`], a rejected
//! or failed synchronous generation as [`GenerationError`], and any failure
//! of a status query as [`PollError`]. A `PollError` is always transient:
//! it never means the job itself failed.

use crate::types::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}

/// The document store or the object store was unavailable or rejected an
/// operation. Callers must not assume a retry will succeed.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached or failed mid-operation.
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] BoxError),

    /// The backend refused the operation (invalid payload, immutable field).
    #[error("Storage rejected operation: {0}")]
    Rejected(String),
}

impl StorageError {
    /// Wrap any backend error as [`StorageError::Unavailable`].
    pub fn unavailable(err: impl Into<BoxError>) -> Self {
        StorageError::Unavailable(err.into())
    }
}

/// The model service rejected or failed a request. No record is written
/// for a request that ends in this error.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The service answered with a non-success status.
    #[error("Model service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("Model service unreachable: {0}")]
    Transport(#[source] BoxError),

    /// The response did not have the expected shape.
    #[error("Unexpected model service response: {0}")]
    InvalidResponse(String),
}

/// A status query (`poll` or `list_jobs`) failed for network or service
/// reasons. Swallowed by the background poll loop and retried on the next
/// interval.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Status query failed ({status}): {body}")]
    Service { status: u16, body: String },

    #[error("Status query unreachable: {0}")]
    Transport(#[source] BoxError),

    #[error("Unexpected status response: {0}")]
    InvalidResponse(String),
}
