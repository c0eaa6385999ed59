//! Shared fakes for pipeline integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gallery_cloud::{CdnRewrite, MemoryObjectStore, ObjectStore};
use gallery_core::error::{GenerationError, PollError, StorageError};
use gallery_core::identity::OutputKeyIdentity;
use gallery_core::job::{JobFilter, JobHandle, JobState, JobStatus};
use gallery_core::media::{MediaRecord, MediaType, MediaUpsert};
use gallery_core::request::{ImageGenerationRequest, VideoGenerationRequest};
use gallery_db::{MediaStore, MemoryMediaStore};
use gallery_gateway::GenerationGateway;
use gallery_pipeline::{
    HistoryView, JobReconciler, Orchestrator, ReconcilerConfig, TrackedJob,
};
use serde_json::json;

pub const CDN: &str = "cdn.example";
pub const BUCKET: &str = "bucket";
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);
pub const RETENTION: Duration = Duration::from_secs(10 * 60);

// ---------------------------------------------------------------------------
// Scripted gateway
// ---------------------------------------------------------------------------

/// One scripted `poll` answer.
#[derive(Debug, Clone)]
pub enum Step {
    Running,
    Completed,
    Failed(&'static str),
    Transient,
}

pub fn job_status(arn: &str, record_id: &str, state: JobState, failure: Option<&str>) -> JobStatus {
    let output_uri = format!("s3://{BUCKET}/{record_id}");
    let mut raw = json!({
        "invocationArn": arn,
        "status": state.as_str(),
        "outputDataConfig": { "s3OutputDataConfig": { "s3Uri": output_uri } },
    });
    if let Some(message) = failure {
        raw["failureMessage"] = json!(message);
    }
    JobStatus {
        invocation_arn: arn.to_string(),
        state,
        output_uri: Some(output_uri),
        failure_message: failure.map(str::to_string),
        raw,
    }
}

/// Gateway whose answers are scripted per job.
///
/// Job `arn` always writes to `s3://bucket/{record id}`; the record id is
/// registered when the script is set or a video is submitted. When a
/// script runs out, its last step repeats.
#[derive(Default)]
pub struct ScriptedGateway {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    last_step: Mutex<HashMap<String, Step>>,
    record_ids: Mutex<HashMap<String, String>>,
    listed: Mutex<Vec<JobStatus>>,
    images: Mutex<Vec<Vec<u8>>>,
    next_submit: Mutex<Option<(String, String)>>,
    pub polls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub fail_generation: Mutex<bool>,
    pub fail_listing: Mutex<bool>,
}

impl ScriptedGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, arn: &str, record_id: &str, steps: Vec<Step>) {
        self.record_ids
            .lock()
            .unwrap()
            .insert(arn.to_string(), record_id.to_string());
        self.scripts
            .lock()
            .unwrap()
            .insert(arn.to_string(), steps.into());
    }

    /// Handle returned by the next `submit_video`.
    pub fn next_submission(&self, arn: &str, record_id: &str) {
        *self.next_submit.lock().unwrap() = Some((arn.to_string(), record_id.to_string()));
    }

    pub fn set_listed(&self, jobs: Vec<JobStatus>) {
        *self.listed.lock().unwrap() = jobs;
    }

    pub fn set_images(&self, images: Vec<Vec<u8>>) {
        *self.images.lock().unwrap() = images;
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next_step(&self, arn: &str) -> Step {
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(arn)
            .and_then(VecDeque::pop_front);
        let mut last = self.last_step.lock().unwrap();
        match scripted {
            Some(step) => {
                last.insert(arn.to_string(), step.clone());
                step
            }
            None => last.get(arn).cloned().unwrap_or(Step::Running),
        }
    }
}

#[async_trait]
impl GenerationGateway for ScriptedGateway {
    async fn generate_image(
        &self,
        _request: &ImageGenerationRequest,
    ) -> Result<Vec<Vec<u8>>, GenerationError> {
        if *self.fail_generation.lock().unwrap() {
            return Err(GenerationError::Service {
                status: 400,
                body: "ValidationException".into(),
            });
        }
        Ok(self.images.lock().unwrap().clone())
    }

    async fn submit_video(
        &self,
        _request: &VideoGenerationRequest,
    ) -> Result<JobHandle, GenerationError> {
        if *self.fail_generation.lock().unwrap() {
            return Err(GenerationError::Service {
                status: 400,
                body: "ValidationException".into(),
            });
        }
        let (arn, record_id) = self
            .next_submit
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| ("arn:job/default".into(), "default".into()));
        self.record_ids
            .lock()
            .unwrap()
            .insert(arn.clone(), record_id.clone());
        Ok(JobHandle {
            invocation_arn: arn,
            output_uri: format!("s3://{BUCKET}/{record_id}/output.mp4"),
        })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, PollError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let arn = handle.invocation_arn.as_str();
        let record_id = self
            .record_ids
            .lock()
            .unwrap()
            .get(arn)
            .cloned()
            .unwrap_or_default();

        match self.next_step(arn) {
            Step::Running => Ok(job_status(arn, &record_id, JobState::InProgress, None)),
            Step::Completed => Ok(job_status(arn, &record_id, JobState::Completed, None)),
            Step::Failed(message) => Ok(job_status(arn, &record_id, JobState::Failed, Some(message))),
            Step::Transient => Err(PollError::Transport("connection reset".into())),
        }
    }

    async fn list_jobs(&self, _filter: Option<&JobFilter>) -> Result<Vec<JobStatus>, PollError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_listing.lock().unwrap() {
            return Err(PollError::Service {
                status: 503,
                body: "ServiceUnavailable".into(),
            });
        }
        Ok(self.listed.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Failing stores
// ---------------------------------------------------------------------------

/// Media store that fails the next `fail_upserts` upserts, then delegates.
pub struct FlakyStore {
    inner: MemoryMediaStore,
    pub fail_upserts: Mutex<usize>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryMediaStore::new(),
            fail_upserts: Mutex::new(0),
        })
    }

    pub fn fail_next_upserts(&self, n: usize) {
        *self.fail_upserts.lock().unwrap() = n;
    }
}

#[async_trait]
impl MediaStore for FlakyStore {
    async fn get(&self, id: &str) -> Result<Option<MediaRecord>, StorageError> {
        self.inner.get(id).await
    }

    async fn upsert(&self, upsert: MediaUpsert) -> Result<MediaRecord, StorageError> {
        {
            let mut remaining = self.fail_upserts.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::unavailable("document store timed out"));
            }
        }
        self.inner.upsert(upsert).await
    }

    async fn list(&self, media_type: Option<MediaType>) -> Result<Vec<MediaRecord>, StorageError> {
        self.inner.list(media_type).await
    }
}

/// Object store that rejects every write.
pub struct BrokenObjectStore {
    cdn: CdnRewrite,
}

impl BrokenObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cdn: CdnRewrite::new(CDN),
        })
    }
}

#[async_trait]
impl ObjectStore for BrokenObjectStore {
    async fn put(&self, _key: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        Err(StorageError::unavailable("bucket unreachable"))
    }

    fn public_url(&self, key: &str) -> String {
        self.cdn.url(key)
    }

    async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
        Err(StorageError::unavailable("bucket unreachable"))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<dyn MediaStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub reconciler: Arc<JobReconciler>,
    pub orchestrator: Orchestrator,
    pub history: HistoryView,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stores(
            Arc::new(MemoryMediaStore::new()),
            Arc::new(MemoryObjectStore::new(CdnRewrite::new(CDN))),
        )
    }

    pub fn with_stores(store: Arc<dyn MediaStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self::with_gateway(store, objects, ScriptedGateway::new())
    }

    pub fn with_gateway(
        store: Arc<dyn MediaStore>,
        objects: Arc<dyn ObjectStore>,
        gateway: Arc<ScriptedGateway>,
    ) -> Self {
        let reconciler = JobReconciler::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            gateway.clone(),
            Arc::new(OutputKeyIdentity::default()),
            ReconcilerConfig {
                poll_interval: POLL_INTERVAL,
                retention: RETENTION,
            },
        );
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            Arc::clone(&objects),
            gateway.clone(),
            Arc::clone(&reconciler),
            "amazon.nova-reel-v1:1",
        );
        let history = HistoryView::new(Arc::clone(&store), Arc::clone(&reconciler));
        Self {
            store,
            objects,
            gateway,
            reconciler,
            orchestrator,
            history,
        }
    }

    /// Store an in-progress VIDEO record for job `arn`.
    pub async fn seed_pending_video(&self, record_id: &str, arn: &str) -> MediaRecord {
        self.store
            .upsert(
                MediaUpsert::new(record_id, MediaType::Video)
                    .with_model_type("amazon.nova-reel-v1:1")
                    .with_prompt("a red fox in snow")
                    .with_details(json!({
                        "status": "InProgress",
                        "invocationArn": arn,
                        "outputDataConfig": {
                            "s3OutputDataConfig": { "s3Uri": format!("s3://{BUCKET}/{record_id}") }
                        },
                    })),
            )
            .await
            .unwrap()
    }

    pub async fn record(&self, record_id: &str) -> MediaRecord {
        self.store.get(record_id).await.unwrap().unwrap()
    }

    /// Advance the paused clock one poll interval at a time until the job
    /// reaches a terminal tracked state.
    pub async fn wait_terminal(&self, record_id: &str) -> TrackedJob {
        for _ in 0..50 {
            if let Some(job) = self.reconciler.status(record_id).await {
                if job.state.is_terminal() && self.reconciler.active_loops().await == 0 {
                    return job;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        panic!("job {record_id} did not reach a terminal state");
    }

    /// Let `n` poll intervals elapse.
    pub async fn advance_intervals(&self, n: u32) {
        for _ in 0..n {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
