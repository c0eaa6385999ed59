use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gallery_core::error::{CoreError, StorageError};
use gallery_pipeline::PipelineError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`PipelineError`] and implements [`IntoResponse`]
/// to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `gallery_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure from the generation pipeline.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Pipeline(err.into())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) | AppError::Pipeline(PipelineError::Core(core)) => {
                classify_core_error(core)
            }

            // --- Pipeline failures ---
            AppError::Pipeline(PipelineError::Storage(err)) => match err {
                StorageError::Rejected(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                StorageError::Unavailable(_) => {
                    tracing::error!(error = %err, "Storage failure");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "STORAGE_UNAVAILABLE",
                        "Media storage is unavailable".to_string(),
                    )
                }
            },
            AppError::Pipeline(PipelineError::Generation(err)) => {
                tracing::warn!(error = %err, "Generation failed");
                (StatusCode::BAD_GATEWAY, "GENERATION_FAILED", err.to_string())
            }
            AppError::Pipeline(PipelineError::Poll(err)) => {
                tracing::warn!(error = %err, "Job status query failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STATUS_UNAVAILABLE",
                    err.to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: &CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
