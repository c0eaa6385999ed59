//! Handlers for generation requests and the media gallery.
//!
//! Routes:
//! - `POST /images`        generate images (blocking)
//! - `POST /videos`        submit a video job
//! - `GET  /media`         gallery listing, optionally synced first
//! - `GET  /media/{*id}`   one record with its tracking state
//! - `POST /media/sync`    pull-based job sync

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use gallery_core::media::{MediaRecord, MediaType};
use gallery_core::naming::video_key;
use gallery_core::request::{ImageGenerationRequest, RequestContext, VideoGenerationRequest};
use gallery_pipeline::{HistoryQuery, TrackedJob};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Optional caller session, echoed into record details and log spans.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Set by the request-id layer on every incoming request.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body of `GET /media/{id}`.
#[derive(Debug, Serialize)]
pub struct MediaDetail {
    pub record: MediaRecord,
    /// Poll-loop state, when this process is tracking the job.
    pub tracked: Option<TrackedJob>,
    /// Whether the video object exists yet. `None` for images or when the
    /// object store could not be asked.
    pub rendered: Option<bool>,
}

/// POST /api/v1/images
pub async fn create_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<ImageGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let ctx = request_context(&headers);
    let records = state.orchestrator.generate_image(&ctx, input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: records })))
}

/// POST /api/v1/videos
///
/// Returns as soon as the job is submitted and recorded; the record is
/// `InProgress` until the reconciler sees the job finish.
pub async fn create_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<VideoGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    let ctx = request_context(&headers);
    let record = state.orchestrator.generate_video(&ctx, input).await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: record })))
}

/// GET /api/v1/media?media_type=IMAGE|VIDEO&sync=true|false
pub async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let records = state.history.get_history(query).await?;
    Ok(Json(DataResponse { data: records }))
}

/// GET /api/v1/media/{*id}
///
/// Ids may contain `/` (they mirror object keys), hence the wildcard.
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.history.get(&id).await?;
    let tracked = state.reconciler.status(&id).await;

    let rendered = match record.media_type {
        MediaType::Image => None,
        MediaType::Video => match state.objects.exists(&video_key(&id)).await {
            Ok(exists) => Some(exists),
            Err(e) => {
                tracing::warn!(record_id = %id, error = %e, "Could not check video object");
                None
            }
        },
    };

    Ok(Json(DataResponse {
        data: MediaDetail {
            record,
            tracked,
            rendered,
        },
    }))
}

/// POST /api/v1/media/sync
pub async fn sync_media(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = state
        .reconciler
        .sync_all()
        .await
        .map_err(AppError::Pipeline)?;
    Ok(Json(DataResponse { data: report }))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn request_context(headers: &HeaderMap) -> RequestContext {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let ctx = RequestContext::new(header(SESSION_ID_HEADER));
    match header(REQUEST_ID_HEADER) {
        Some(request_id) => ctx.with_request_id(request_id),
        None => ctx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn context_reads_session_and_request_id() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_ID_HEADER, HeaderValue::from_static("s-1"));
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("r-1"));

        let ctx = request_context(&headers);
        assert_eq!(ctx.session_id.as_deref(), Some("s-1"));
        assert_eq!(ctx.request_id, "r-1");
    }

    #[test]
    fn blank_session_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_ID_HEADER, HeaderValue::from_static("  "));

        let ctx = request_context(&headers);
        assert!(ctx.session_id.is_none());
        assert!(!ctx.request_id.is_empty());
    }
}
