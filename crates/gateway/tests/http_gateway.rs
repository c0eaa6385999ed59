//! Integration tests for `HttpGateway` against a local stand-in for the
//! model service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use gallery_core::error::{GenerationError, PollError};
use gallery_core::job::{JobFilter, JobHandle, JobState};
use gallery_core::request::{ImageGenerationRequest, ImageParams, VideoGenerationRequest, VideoParams};
use gallery_gateway::{GatewayConfig, GenerationGateway, HttpGateway, RetryConfig};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Stand-in service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Fake {
    /// Number of 503 responses to send before answering a job read.
    failures_before_success: AtomicU32,
    job_reads: AtomicU32,
    invokes: AtomicU32,
    last_body: Mutex<Option<Value>>,
    last_auth: Mutex<Option<String>>,
}

type Shared = Arc<Fake>;

fn job_json(arn: &str, status: &str) -> Value {
    json!({
        "invocationArn": arn,
        "status": status,
        "outputDataConfig": {
            "s3OutputDataConfig": { "s3Uri": format!("s3://media/videos/{arn}") }
        }
    })
}

async fn invoke_model(
    State(fake): State<Shared>,
    Path(model_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.invokes.fetch_add(1, Ordering::SeqCst);
    *fake.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *fake.last_body.lock().unwrap() = Some(body);

    if model_id == "rejecting-model" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "ValidationException" })),
        );
    }
    // "hello" and "world"
    (StatusCode::OK, Json(json!({ "images": ["aGVsbG8=", "d29ybGQ="] })))
}

async fn start_async(State(fake): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    *fake.last_body.lock().unwrap() = Some(body);
    Json(json!({ "invocationArn": "job1" }))
}

async fn get_job(State(fake): State<Shared>, Path(arn): Path<String>) -> (StatusCode, Json<Value>) {
    fake.job_reads.fetch_add(1, Ordering::SeqCst);
    let remaining = fake.failures_before_success.load(Ordering::SeqCst);
    if remaining > 0 {
        fake.failures_before_success
            .store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "ServiceUnavailable" })),
        );
    }
    (StatusCode::OK, Json(job_json(&arn, "InProgress")))
}

async fn list_jobs(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let status = query.get("statusEquals").cloned();
    let page = query.get("nextToken").cloned();

    let summaries = match page.as_deref() {
        None => vec![job_json("a", "Completed"), job_json("b", "InProgress")],
        Some(_) => vec![job_json("c", "Failed")],
    };
    let summaries: Vec<Value> = summaries
        .into_iter()
        .filter(|s| status.as_deref().map_or(true, |st| s["status"] == st))
        .collect();

    match page {
        None => Json(json!({ "asyncInvokeSummaries": summaries, "nextToken": "page2" })),
        Some(_) => Json(json!({ "asyncInvokeSummaries": summaries })),
    }
}

async fn spawn(fake: Shared) -> String {
    let router = Router::new()
        .route("/model/{model_id}/invoke", post(invoke_model))
        .route("/async-invoke", post(start_async).get(list_jobs))
        .route("/async-invoke/{arn}", get(get_job))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn gateway(endpoint: String) -> HttpGateway {
    HttpGateway::new(GatewayConfig {
        endpoint,
        api_key: Some("test-key".into()),
        output_bucket: "media".into(),
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
        },
        ..Default::default()
    })
    .unwrap()
}

fn image_request(model_id: &str) -> ImageGenerationRequest {
    ImageGenerationRequest {
        model_id: model_id.into(),
        prompt: "a lighthouse".into(),
        params: ImageParams::default(),
    }
}

fn handle(arn: &str) -> JobHandle {
    JobHandle {
        invocation_arn: arn.into(),
        output_uri: format!("s3://media/videos/{arn}"),
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_image_decodes_all_images() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake.clone()).await);

    let images = gateway
        .generate_image(&image_request("amazon.nova-canvas-v1:0"))
        .await
        .unwrap();

    assert_eq!(images, vec![b"hello".to_vec(), b"world".to_vec()]);
    assert_eq!(
        fake.last_auth.lock().unwrap().as_deref(),
        Some("Bearer test-key")
    );
    let body = fake.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["taskType"], "TEXT_IMAGE");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake.clone()).await);

    let result = gateway.generate_image(&image_request("rejecting-model")).await;

    assert_matches!(result, Err(GenerationError::Service { status: 400, .. }));
    assert_eq!(fake.invokes.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Video jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_video_reads_back_output_location() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake.clone()).await);

    let request = VideoGenerationRequest {
        model_id: None,
        prompt: "waves at night".into(),
        reference_image: None,
        params: VideoParams::default(),
    };
    let handle = gateway.submit_video(&request).await.unwrap();

    assert_eq!(handle.invocation_arn, "job1");
    assert_eq!(handle.output_uri, "s3://media/videos/job1");

    let body = fake.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(body["modelId"], "amazon.nova-reel-v1:1");
    assert_eq!(body["modelInput"]["taskType"], "TEXT_VIDEO");
    assert_eq!(
        body["outputDataConfig"]["s3OutputDataConfig"]["s3Uri"],
        "s3://media/videos/"
    );
    assert!(body["clientRequestToken"].as_str().is_some());
}

#[tokio::test]
async fn submit_video_survives_unreadable_job() {
    let fake = Shared::default();
    fake.failures_before_success.store(10, Ordering::SeqCst);
    let gateway = gateway(spawn(fake.clone()).await);

    let request = VideoGenerationRequest {
        model_id: None,
        prompt: "waves at night".into(),
        reference_image: None,
        params: VideoParams::default(),
    };
    let handle = gateway.submit_video(&request).await.unwrap();

    // Same location the service reports once the job is readable.
    assert_eq!(handle.invocation_arn, "job1");
    assert_eq!(handle.output_uri, "s3://media/videos/job1");
    assert_eq!(fake.job_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn poll_retries_transient_failures() {
    let fake = Shared::default();
    fake.failures_before_success.store(2, Ordering::SeqCst);
    let gateway = gateway(spawn(fake.clone()).await);

    let status = gateway.poll(&handle("job1")).await.unwrap();

    assert_eq!(status.state, JobState::InProgress);
    assert_eq!(fake.job_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn poll_gives_up_after_max_attempts() {
    let fake = Shared::default();
    fake.failures_before_success.store(10, Ordering::SeqCst);
    let gateway = gateway(spawn(fake.clone()).await);

    let result = gateway.poll(&handle("job1")).await;

    assert_matches!(result, Err(PollError::Service { status: 503, .. }));
    assert_eq!(fake.job_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn poll_encodes_arn_with_slashes() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake).await);

    let arn = "arn:aws:bedrock:us-east-1:123:async-invoke/abc";
    let status = gateway.poll(&handle(arn)).await.unwrap();
    assert_eq!(status.invocation_arn, arn);
}

#[tokio::test]
async fn list_jobs_follows_pages() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake).await);

    let jobs = gateway.list_jobs(None).await.unwrap();
    let arns: Vec<&str> = jobs.iter().map(|j| j.invocation_arn.as_str()).collect();
    assert_eq!(arns, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn list_jobs_with_limit_reads_one_page() {
    let fake = Shared::default();
    let gateway = gateway(spawn(fake).await);

    let filter = JobFilter {
        status: Some(JobState::Completed),
        max_results: Some(10),
    };
    let jobs = gateway.list_jobs(Some(&filter)).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].state, JobState::Completed);
}
