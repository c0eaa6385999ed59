//! Video job reconciler.
//!
//! Brings stored VIDEO records in line with the model service. Three paths
//! feed the same [`JobReconciler::apply_status`] funnel:
//!
//! * a background poll loop per in-flight job, armed by [`JobReconciler::track`]
//!   at submission time;
//! * [`JobReconciler::sync_all`], a pull-based batch sync run on reads;
//! * [`JobReconciler::recover`], run once at process start to re-arm poll
//!   loops for records left in progress by a previous process.
//!
//! Every poll loop runs under a child of the reconciler's master
//! [`CancellationToken`], so [`JobReconciler::shutdown`] stops them all
//! without touching the store.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gallery_cloud::ObjectStore;
use gallery_core::error::StorageError;
use gallery_core::identity::JobIdentity;
use gallery_core::job::{JobHandle, JobState, JobStatus};
use gallery_core::media::{MediaType, MediaUpsert, DETAILS_INVOCATION_ARN, DETAILS_STATUS};
use gallery_core::naming::video_key;
use gallery_core::types::Timestamp;
use gallery_db::MediaStore;
use gallery_gateway::GenerationGateway;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Default interval between two polls of the same job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default time a finished job stays readable through [`JobReconciler::status`].
pub const DEFAULT_TRACKED_RETENTION: Duration = Duration::from_secs(60 * 60);

/// How long shutdown waits for each poll task to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    /// How long a job is kept in memory after its poll loop ends.
    pub retention: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retention: DEFAULT_TRACKED_RETENTION,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracked jobs
// ---------------------------------------------------------------------------

/// In-memory lifecycle of a job this process is polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackedState {
    /// Submitted, not polled yet.
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TrackedState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl From<JobState> for TrackedState {
    fn from(state: JobState) -> Self {
        match state {
            JobState::InProgress => Self::InProgress,
            JobState::Completed => Self::Completed,
            JobState::Failed => Self::Failed,
        }
    }
}

/// Snapshot of a tracked job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedJob {
    pub record_id: String,
    pub invocation_arn: String,
    pub state: TrackedState,
    /// Successful and failed polls so far.
    pub polls: u32,
    pub last_error: Option<String>,
    pub started_at: Timestamp,
    pub last_checked: Option<Timestamp>,
}

impl TrackedJob {
    fn new(record_id: &str, handle: &JobHandle) -> Self {
        Self {
            record_id: record_id.to_string(),
            invocation_arn: handle.invocation_arn.clone(),
            state: TrackedState::Pending,
            polls: 0,
            last_error: None,
            started_at: Utc::now(),
            last_checked: None,
        }
    }
}

/// Result of funnelling one remote status into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ApplyOutcome {
    /// The record was updated to the remote state.
    Updated,
    /// The stored state already matches the remote state.
    Unchanged,
    /// The record is already terminal; the remote status was ignored.
    TerminalConflict { stored: JobState },
    /// No record exists for the id.
    Missing,
}

/// Counters for one pull-based sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Non-terminal VIDEO records considered.
    pub scanned: usize,
    pub updated: usize,
    /// Records with no remote job or no change.
    pub skipped: usize,
}

/// A tracked job plus the instant its poll loop ended.
struct JobEntry {
    job: TrackedJob,
    finished_at: Option<Instant>,
}

/// Internal bookkeeping for a running poll loop.
struct PollTask {
    task_handle: tokio::task::JoinHandle<()>,
    /// Per-job cancellation token (child of the master token).
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

pub struct JobReconciler {
    store: Arc<dyn MediaStore>,
    objects: Arc<dyn ObjectStore>,
    gateway: Arc<dyn GenerationGateway>,
    identity: Arc<dyn JobIdentity>,
    config: ReconcilerConfig,
    /// Tracked jobs indexed by record id. Entries outlive their loop by
    /// `config.retention` so callers can read the final state.
    jobs: RwLock<HashMap<String, JobEntry>>,
    /// Running poll loops indexed by record id.
    tasks: Mutex<HashMap<String, PollTask>>,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl JobReconciler {
    /// Returns a shared handle that is safe to clone into Axum state.
    pub fn new(
        store: Arc<dyn MediaStore>,
        objects: Arc<dyn ObjectStore>,
        gateway: Arc<dyn GenerationGateway>,
        identity: Arc<dyn JobIdentity>,
        config: ReconcilerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            objects,
            gateway,
            identity,
            config,
            jobs: RwLock::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            cancel: CancellationToken::new(),
        })
    }

    pub fn identity(&self) -> &dyn JobIdentity {
        self.identity.as_ref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Arm a background poll loop for `record_id`.
    ///
    /// Returns `false` without doing anything when a loop for the record is
    /// already running or the reconciler is shutting down.
    pub async fn track(self: &Arc<Self>, record_id: &str, handle: JobHandle) -> bool {
        if self.cancel.is_cancelled() {
            tracing::warn!(record_id, "Reconciler is shutting down, not tracking job");
            return false;
        }

        // Held until the new task is registered so that the task's own
        // removal cannot run first.
        let mut tasks = self.tasks.lock().await;
        if tasks
            .get(record_id)
            .is_some_and(|t| !t.task_handle.is_finished())
        {
            tracing::debug!(record_id, "Job already tracked");
            return false;
        }

        self.evict_finished().await;
        self.jobs.write().await.insert(
            record_id.to_string(),
            JobEntry {
                job: TrackedJob::new(record_id, &handle),
                finished_at: None,
            },
        );

        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let reconciler = Arc::clone(self);
        let id = record_id.to_string();

        let task_handle = tokio::spawn(async move {
            reconciler.run_poll_loop(&id, &handle, &task_cancel).await;
            if let Some(entry) = reconciler.jobs.write().await.get_mut(&id) {
                entry.finished_at = Some(Instant::now());
            }
            reconciler.tasks.lock().await.remove(&id);
        });

        tasks.insert(
            record_id.to_string(),
            PollTask {
                task_handle,
                cancel,
            },
        );
        true
    }

    /// Snapshot of a tracked job, if this process has tracked it.
    pub async fn status(&self, record_id: &str) -> Option<TrackedJob> {
        self.jobs
            .read()
            .await
            .get(record_id)
            .map(|entry| entry.job.clone())
    }

    /// Snapshot of all tracked jobs.
    pub async fn tracked(&self) -> Vec<TrackedJob> {
        self.jobs
            .read()
            .await
            .values()
            .map(|entry| entry.job.clone())
            .collect()
    }

    /// Drop jobs whose poll loop ended more than `retention` ago.
    ///
    /// Runs on every [`track`](Self::track); returns the number evicted.
    pub async fn evict_finished(&self) -> usize {
        let retention = self.config.retention;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, entry| {
            entry
                .finished_at
                .map_or(true, |finished| finished.elapsed() < retention)
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = jobs.len(), "Evicted finished jobs");
        }
        evicted
    }

    /// Number of poll loops currently running.
    pub async fn active_loops(&self) -> usize {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|t| !t.task_handle.is_finished())
            .count()
    }

    /// Write one remote status into the store.
    ///
    /// Terminal records are never changed. A `Completed` status also sets
    /// the record's public URL.
    pub async fn apply_status(
        &self,
        record_id: &str,
        status: &JobStatus,
    ) -> Result<ApplyOutcome, StorageError> {
        let Some(record) = self.store.get(record_id).await? else {
            return Ok(ApplyOutcome::Missing);
        };
        if record.media_type != MediaType::Video {
            return Err(StorageError::Rejected(format!(
                "record '{record_id}' is {}, not a video job",
                record.media_type
            )));
        }

        let stored = record.job_state();
        if stored == Some(status.state) {
            return Ok(ApplyOutcome::Unchanged);
        }
        if let Some(stored) = stored.filter(|s| !s.can_transition_to(status.state)) {
            tracing::warn!(
                record_id,
                stored = %stored,
                remote = %status.state,
                "Ignoring status update for terminal record",
            );
            return Ok(ApplyOutcome::TerminalConflict { stored });
        }

        let mut details = match &status.raw {
            serde_json::Value::Object(_) => status.raw.clone(),
            _ => json!({ DETAILS_INVOCATION_ARN: status.invocation_arn }),
        };
        details[DETAILS_STATUS] = json!(status.state.as_str());

        let mut upsert = MediaUpsert::new(record_id, MediaType::Video).with_details(details);
        if status.state == JobState::Completed {
            upsert = upsert.with_url(self.objects.public_url(&video_key(record_id)));
        }
        self.store.upsert(upsert).await?;

        tracing::info!(
            record_id,
            invocation_arn = %status.invocation_arn,
            previous = ?stored,
            state = %status.state,
            "Job status updated",
        );
        self.set_state(record_id, status.state.into()).await;
        Ok(ApplyOutcome::Updated)
    }

    /// Pull-based sync: one bulk status query, then update every
    /// non-terminal VIDEO record whose remote state differs.
    ///
    /// A failed record update does not stop the others; the first such
    /// error is returned once every record has been tried.
    pub async fn sync_all(&self) -> Result<SyncReport, PipelineError> {
        let jobs = self.gateway.list_jobs(None).await?;

        let mut remote: HashMap<String, JobStatus> = HashMap::new();
        for job in jobs {
            let Some(record_id) = job
                .output_uri
                .as_deref()
                .and_then(|uri| self.identity.record_id(uri))
            else {
                continue;
            };
            // A terminal entry wins over a stale one for the same record.
            let keep_existing = remote
                .get(&record_id)
                .is_some_and(|existing| existing.state.is_terminal());
            if !keep_existing {
                remote.insert(record_id, job);
            }
        }

        let pending = self.store.list_pending_videos().await?;
        let mut report = SyncReport {
            scanned: pending.len(),
            ..Default::default()
        };

        let mut first_error: Option<StorageError> = None;
        for record in pending {
            let Some(status) = remote.get(&record.id) else {
                report.skipped += 1;
                continue;
            };
            if record.job_state() == Some(status.state) {
                report.skipped += 1;
                continue;
            }
            match self.apply_status(&record.id, status).await {
                Ok(ApplyOutcome::Updated) => report.updated += 1,
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(record_id = %record.id, error = %e, "Sync update failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        tracing::debug!(
            scanned = report.scanned,
            updated = report.updated,
            skipped = report.skipped,
            failed = first_error.is_some(),
            "Job sync complete",
        );
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(report),
        }
    }

    /// Re-arm poll loops for every VIDEO record left in progress.
    ///
    /// Records without a recoverable job handle are left to the
    /// pull-based sync. Returns the number of loops armed.
    pub async fn recover(self: &Arc<Self>) -> Result<usize, StorageError> {
        let pending = self.store.list_pending_videos().await?;
        let mut armed = 0;

        for record in pending {
            match record.job_handle() {
                Some(handle) => {
                    if self.track(&record.id, handle).await {
                        armed += 1;
                    }
                }
                None => tracing::warn!(
                    record_id = %record.id,
                    "Pending video has no job handle, leaving it to sync",
                ),
            }
        }

        tracing::info!(armed, "Recovered pending video jobs");
        Ok(armed)
    }

    /// Stop all poll loops.
    ///
    /// Cancels the master token, then waits up to 5 seconds per task for a
    /// clean exit. Records stay in progress for the next start.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down job reconciler");
        self.cancel.cancel();

        // Drained first: exiting tasks take the same lock to deregister.
        let drained: Vec<(String, PollTask)> = self.tasks.lock().await.drain().collect();
        for (record_id, task) in drained {
            tracing::debug!(record_id = %record_id, "Stopping poll loop");
            task.cancel.cancel();
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, task.task_handle).await;
        }

        tracing::info!("Job reconciler shut down complete");
    }

    // ---- private helpers ----

    /// Poll until the job is terminal, the loop fails, or it is cancelled.
    async fn run_poll_loop(&self, record_id: &str, handle: &JobHandle, cancel: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            record_id,
            invocation_arn = %handle.invocation_arn,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Poll loop started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(record_id, "Poll loop cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if self.poll_once(record_id, handle).await.is_break() {
                        break;
                    }
                }
            }
        }

        tracing::info!(record_id, "Poll loop exited");
    }

    async fn poll_once(&self, record_id: &str, handle: &JobHandle) -> ControlFlow<()> {
        let status = match self.gateway.poll(handle).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    record_id,
                    error = %e,
                    "Poll failed, retrying next interval",
                );
                self.record_poll(record_id, Some(e.to_string())).await;
                return ControlFlow::Continue(());
            }
        };
        self.record_poll(record_id, None).await;

        match self.apply_status(record_id, &status).await {
            Ok(ApplyOutcome::Updated | ApplyOutcome::Unchanged) => {
                self.set_state(record_id, status.state.into()).await;
                if status.state.is_terminal() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
            Ok(ApplyOutcome::TerminalConflict { stored }) => {
                self.set_state(record_id, stored.into()).await;
                ControlFlow::Break(())
            }
            Ok(ApplyOutcome::Missing) => {
                tracing::warn!(record_id, "Record not found, stopping poll loop");
                self.mark_failed(record_id, "record not found").await;
                ControlFlow::Break(())
            }
            Err(e) => {
                // The record stays in progress; sync and recovery catch it up.
                tracing::error!(
                    record_id,
                    invocation_arn = %handle.invocation_arn,
                    error = %e,
                    "Applying job status failed, stopping poll loop",
                );
                self.mark_failed(record_id, &e.to_string()).await;
                ControlFlow::Break(())
            }
        }
    }

    async fn mark_failed(&self, record_id: &str, reason: &str) {
        if let Some(entry) = self.jobs.write().await.get_mut(record_id) {
            entry.job.state = TrackedState::Failed;
            entry.job.last_error = Some(reason.to_string());
        }
    }

    async fn set_state(&self, record_id: &str, state: TrackedState) {
        if let Some(entry) = self.jobs.write().await.get_mut(record_id) {
            if !entry.job.state.is_terminal() {
                entry.job.state = state;
            }
        }
    }

    async fn record_poll(&self, record_id: &str, error: Option<String>) {
        if let Some(entry) = self.jobs.write().await.get_mut(record_id) {
            let job = &mut entry.job;
            job.polls += 1;
            job.last_checked = Some(Utc::now());
            job.last_error = error;
        }
    }
}
