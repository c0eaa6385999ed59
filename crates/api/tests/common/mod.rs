#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use gallery_api::config::{ServerConfig, StoreBackend};
use gallery_api::router::build_app_router;
use gallery_api::state::AppState;
use gallery_cloud::{CdnRewrite, MemoryObjectStore, S3Settings};
use gallery_core::error::{GenerationError, PollError};
use gallery_core::identity::OutputKeyIdentity;
use gallery_core::job::{JobFilter, JobHandle, JobState, JobStatus};
use gallery_core::request::{ImageGenerationRequest, VideoGenerationRequest};
use gallery_db::MemoryMediaStore;
use gallery_gateway::{GatewayConfig, GenerationGateway};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const CDN: &str = "cdn.example";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        database_url: None,
        s3: S3Settings {
            bucket: "gallery-media".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            static_credentials: None,
        },
        cdn_domain: CDN.to_string(),
        gateway: GatewayConfig::default(),
        poll_interval: Duration::from_secs(30),
        tracked_retention: Duration::from_secs(3600),
        job_id_pattern: None,
    }
}

// ---------------------------------------------------------------------------
// Fake gateway
// ---------------------------------------------------------------------------

/// Gateway stand-in. Videos are written below `s3://gallery-media/videos/`
/// and stay in progress unless listed otherwise.
#[derive(Default)]
pub struct FakeGateway {
    pub images: Mutex<Vec<Vec<u8>>>,
    pub listed: Mutex<Vec<JobStatus>>,
    pub fail_generation: Mutex<bool>,
    pub fail_listing: Mutex<bool>,
    submitted: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Remote status for the video recorded as `videos/{job}`.
    pub fn list_as(&self, job: &str, state: JobState) {
        let raw = json!({
            "invocationArn": format!("arn:job/{job}"),
            "status": state.as_str(),
            "outputDataConfig": {
                "s3OutputDataConfig": { "s3Uri": format!("s3://gallery-media/videos/{job}") }
            },
        });
        let status = JobStatus::from_raw(raw).unwrap();
        self.listed.lock().unwrap().push(status);
    }
}

#[async_trait]
impl GenerationGateway for FakeGateway {
    async fn generate_image(
        &self,
        _request: &ImageGenerationRequest,
    ) -> Result<Vec<Vec<u8>>, GenerationError> {
        if *self.fail_generation.lock().unwrap() {
            return Err(GenerationError::Service {
                status: 400,
                body: "ValidationException: blocked content".into(),
            });
        }
        Ok(self.images.lock().unwrap().clone())
    }

    async fn submit_video(
        &self,
        _request: &VideoGenerationRequest,
    ) -> Result<JobHandle, GenerationError> {
        let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobHandle {
            invocation_arn: format!("arn:job/job{n}"),
            output_uri: format!("s3://gallery-media/videos/job{n}"),
        })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, PollError> {
        Ok(JobStatus {
            invocation_arn: handle.invocation_arn.clone(),
            state: JobState::InProgress,
            output_uri: Some(handle.output_uri.clone()),
            failure_message: None,
            raw: json!({
                "invocationArn": handle.invocation_arn,
                "status": "InProgress",
            }),
        })
    }

    async fn list_jobs(&self, _filter: Option<&JobFilter>) -> Result<Vec<JobStatus>, PollError> {
        if *self.fail_listing.lock().unwrap() {
            return Err(PollError::Transport("connection refused".into()));
        }
        Ok(self.listed.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub objects: Arc<MemoryObjectStore>,
}

/// Build the full application router over in-memory stores.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let gateway = FakeGateway::new();
    let objects = Arc::new(MemoryObjectStore::new(CdnRewrite::new(CDN)));

    let state = AppState::new(
        config.clone(),
        Arc::new(MemoryMediaStore::new()),
        objects.clone(),
        gateway.clone(),
        Arc::new(OutputKeyIdentity::default()),
    );
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        gateway,
        objects,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<axum::body::Body> {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response<axum::body::Body> {
    app.oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<axum::body::Body> {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/json")
            .header("x-session-id", "session-1")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<axum::body::Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
