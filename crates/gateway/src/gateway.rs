use async_trait::async_trait;
use gallery_core::error::{GenerationError, PollError};
use gallery_core::job::{JobFilter, JobHandle, JobStatus};
use gallery_core::request::{ImageGenerationRequest, VideoGenerationRequest};

/// Client for the external model service.
///
/// `poll` and `list_jobs` are reads and may be repeated freely. Their
/// failures are [`PollError`]s, which never mean that the job failed.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Generate images synchronously. Returns the raw image bytes; no
    /// partial results.
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<Vec<u8>>, GenerationError>;

    /// Start an asynchronous video job and return its handle immediately.
    async fn submit_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<JobHandle, GenerationError>;

    /// Current status of one job.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, PollError>;

    /// Status of all jobs known to the service, optionally filtered.
    async fn list_jobs(&self, filter: Option<&JobFilter>) -> Result<Vec<JobStatus>, PollError>;
}
