//! Per-request generation flows.
//!
//! Each call carries an explicit [`RequestContext`]; nothing is kept
//! between requests. Images are generated, uploaded and recorded in one
//! call. Videos are submitted, recorded as in progress and handed to the
//! [`JobReconciler`].

use std::sync::Arc;

use gallery_cloud::ObjectStore;
use gallery_core::error::GenerationError;
use gallery_core::job::{JobHandle, JobState};
use gallery_core::media::{MediaRecord, MediaType, MediaUpsert, DETAILS_INVOCATION_ARN, DETAILS_STATUS};
use gallery_core::naming::{image_key, random_id, random_seed, video_key};
use gallery_core::request::{ImageGenerationRequest, RequestContext, VideoGenerationRequest};
use gallery_db::MediaStore;
use gallery_gateway::GenerationGateway;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::error::PipelineError;
use crate::reconciler::JobReconciler;

const IMAGE_CONTENT_TYPE: &str = "image/png";

pub struct Orchestrator {
    store: Arc<dyn MediaStore>,
    objects: Arc<dyn ObjectStore>,
    gateway: Arc<dyn GenerationGateway>,
    reconciler: Arc<JobReconciler>,
    /// Recorded as `model_type` when a video request names no model.
    default_video_model: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn MediaStore>,
        objects: Arc<dyn ObjectStore>,
        gateway: Arc<dyn GenerationGateway>,
        reconciler: Arc<JobReconciler>,
        default_video_model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            objects,
            gateway,
            reconciler,
            default_video_model: default_video_model.into(),
        }
    }

    pub fn reconciler(&self) -> &Arc<JobReconciler> {
        &self.reconciler
    }

    /// Generate images, upload each one and record it as completed.
    ///
    /// A generation failure writes nothing. An upload or store failure
    /// stops at the failing image; images recorded before it are kept.
    pub async fn generate_image(
        &self,
        ctx: &RequestContext,
        request: ImageGenerationRequest,
    ) -> Result<Vec<MediaRecord>, PipelineError> {
        let mut request = request.validated()?;
        request.params.seed.get_or_insert_with(random_seed);

        let span = tracing::info_span!(
            "generate_image",
            request_id = %ctx.request_id,
            session_id = ?ctx.session_id,
            model_id = %request.model_id,
        );

        async {
            let images = self.gateway.generate_image(&request).await?;
            let params = serde_json::to_value(&request.params).unwrap_or(Value::Null);

            let mut records = Vec::with_capacity(images.len());
            for bytes in images {
                let id = random_id();
                let url = self
                    .objects
                    .put(&image_key(&id), bytes, IMAGE_CONTENT_TYPE)
                    .await?;

                let details = with_context(
                    json!({
                        DETAILS_STATUS: JobState::Completed.as_str(),
                        "params": params,
                    }),
                    ctx,
                );
                let record = self
                    .store
                    .upsert(
                        MediaUpsert::new(id, MediaType::Image)
                            .with_model_type(&request.model_id)
                            .with_prompt(&request.prompt)
                            .with_url(url)
                            .with_details(details),
                    )
                    .await?;
                tracing::info!(record_id = %record.id, "Image recorded");
                records.push(record);
            }
            Ok::<_, PipelineError>(records)
        }
        .instrument(span)
        .await
    }

    /// Submit a video job, record it as in progress and start tracking it.
    pub async fn generate_video(
        &self,
        ctx: &RequestContext,
        request: VideoGenerationRequest,
    ) -> Result<MediaRecord, PipelineError> {
        let mut request = request.validated()?;
        request.params.seed = Some(request.params.resolved_seed());

        let span = tracing::info_span!(
            "generate_video",
            request_id = %ctx.request_id,
            session_id = ?ctx.session_id,
        );

        async {
            let handle = self.gateway.submit_video(&request).await?;
            let id = self
                .reconciler
                .identity()
                .record_id(&handle.output_uri)
                .ok_or_else(|| {
                    GenerationError::InvalidResponse(format!(
                        "no record id in job output location '{}'",
                        handle.output_uri
                    ))
                })?;

            let model_type = request
                .model_id
                .clone()
                .unwrap_or_else(|| self.default_video_model.clone());
            let upsert = MediaUpsert::new(id.clone(), MediaType::Video)
                .with_model_type(model_type)
                .with_prompt(&request.prompt)
                .with_reference_image(request.reference_image.clone())
                .with_url(self.objects.public_url(&video_key(&id)))
                .with_details(with_context(pending_details(&handle, &request), ctx));

            let record = self.store.upsert(upsert).await.map_err(|e| {
                tracing::error!(
                    record_id = %id,
                    invocation_arn = %handle.invocation_arn,
                    error = %e,
                    "Video job submitted but its record could not be written",
                );
                e
            })?;

            tracing::info!(
                record_id = %record.id,
                invocation_arn = %handle.invocation_arn,
                "Video job recorded",
            );
            self.reconciler.track(&record.id, handle).await;
            Ok::<_, PipelineError>(record)
        }
        .instrument(span)
        .await
    }
}

/// `details` of a freshly submitted video job.
fn pending_details(handle: &JobHandle, request: &VideoGenerationRequest) -> Value {
    json!({
        DETAILS_STATUS: JobState::InProgress.as_str(),
        DETAILS_INVOCATION_ARN: handle.invocation_arn,
        "outputDataConfig": {
            "s3OutputDataConfig": { "s3Uri": handle.output_uri }
        },
        "params": request.params,
    })
}

fn with_context(mut details: Value, ctx: &RequestContext) -> Value {
    details["requestId"] = json!(ctx.request_id);
    if let Some(session_id) = &ctx.session_id {
        details["sessionId"] = json!(session_id);
    }
    details
}
