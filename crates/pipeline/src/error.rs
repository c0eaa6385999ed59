use gallery_core::error::{CoreError, GenerationError, PollError, StorageError};

/// Errors surfaced by user-initiated pipeline operations (submit, read,
/// on-demand sync). The background poll loop never returns these; it logs
/// and either retries or marks the job failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Poll(#[from] PollError),
}
