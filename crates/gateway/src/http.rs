//! REST client for the model service.
//!
//! Targets the runtime API shape: synchronous `POST /model/{id}/invoke`
//! for images and the `async-invoke` resource for video jobs. Every call
//! goes through [`HttpGateway::send`], which applies bounded timeouts and
//! exponential-backoff retries on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use gallery_core::error::{GenerationError, PollError};
use gallery_core::job::{JobFilter, JobHandle, JobStatus};
use gallery_core::naming::random_id;
use gallery_core::request::{ImageGenerationRequest, VideoGenerationRequest};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::body;
use crate::error::HttpGatewayError;
use crate::gateway::GenerationGateway;
use crate::retry::{next_delay, RetryConfig};

/// Default video model.
pub const DEFAULT_VIDEO_MODEL_ID: &str = "amazon.nova-reel-v1:1";

/// Page size used when listing jobs without an explicit limit.
const LIST_PAGE_SIZE: u32 = 100;

/// Settings for [`HttpGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL, e.g. `https://bedrock-runtime.us-east-1.amazonaws.com`.
    pub endpoint: String,
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    /// Model used when a video request does not name one.
    pub video_model_id: String,
    /// Bucket the service writes video output to.
    pub output_bucket: String,
    /// Key prefix for video output inside `output_bucket`.
    pub video_prefix: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://bedrock-runtime.us-east-1.amazonaws.com".into(),
            api_key: None,
            video_model_id: DEFAULT_VIDEO_MODEL_ID.into(),
            output_bucket: "gallery-media".into(),
            video_prefix: "videos".into(),
            connect_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(300),
            retry: RetryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Output location requested for new video jobs.
    pub fn video_output_uri(&self) -> String {
        let prefix = self.video_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("s3://{}/", self.output_bucket)
        } else {
            format!("s3://{}/{}/", self.output_bucket, prefix)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartAsyncResponse {
    invocation_arn: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAsyncResponse {
    #[serde(default)]
    async_invoke_summaries: Vec<Value>,
    next_token: Option<String>,
}

/// HTTP implementation of [`GenerationGateway`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, HttpGatewayError> {
        let base = Url::parse(&config.endpoint)
            .map_err(|e| HttpGatewayError::InvalidEndpoint(format!("{}: {e}", config.endpoint)))?;
        if base.cannot_be_a_base() {
            return Err(HttpGatewayError::InvalidEndpoint(config.endpoint.clone()));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ---- private helpers ----

    /// Base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// `build` is called once per attempt since a `RequestBuilder` is
    /// consumed by `send`.
    async fn send<F>(&self, operation: &'static str, build: F) -> Result<Value, HttpGatewayError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let retry = &self.config.retry;
        let mut delay = retry.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.send_once(&build).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < retry.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model service call failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    delay = next_delay(delay, retry);
                }
                Err(e) => {
                    tracing::debug!(operation, attempt, error = %e, "Model service call failed");
                    return Err(e);
                }
            }
        }
    }

    async fn send_once<F>(&self, build: &F) -> Result<Value, HttpGatewayError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut request = build(&self.client).header("Accept", "application/json");
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }
        let response = Self::ensure_success(request.send().await?).await?;
        Ok(response.json::<Value>().await?)
    }

    /// Return the response unchanged on success, or an
    /// [`HttpGatewayError::Api`] carrying the status and body.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, HttpGatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(HttpGatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_job(&self, invocation_arn: &str) -> Result<JobStatus, HttpGatewayError> {
        let url = self.url(&["async-invoke", invocation_arn]);
        let raw = self.send("get_async_invoke", |c| c.get(url.clone())).await?;
        JobStatus::from_raw(raw).map_err(HttpGatewayError::Decode)
    }

    async fn list_page(
        &self,
        filter: Option<&JobFilter>,
        page_size: u32,
        next_token: Option<&str>,
    ) -> Result<ListAsyncResponse, HttpGatewayError> {
        let mut url = self.url(&["async-invoke"]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(state) = filter.and_then(|f| f.status) {
                query.append_pair("statusEquals", state.as_str());
            }
            query.append_pair("maxResults", &page_size.to_string());
            if let Some(token) = next_token {
                query.append_pair("nextToken", token);
            }
        }

        let raw = self.send("list_async_invokes", |c| c.get(url.clone())).await?;
        serde_json::from_value(raw).map_err(|e| HttpGatewayError::Decode(e.to_string()))
    }
}

/// Output location the service assigns a job: the requested prefix plus
/// the invocation id, the last segment of the ARN.
fn derived_output_uri(requested_uri: &str, invocation_arn: &str) -> String {
    let invocation_id = invocation_arn.rsplit('/').next().unwrap_or(invocation_arn);
    format!("{}/{}", requested_uri.trim_end_matches('/'), invocation_id)
}

#[async_trait]
impl GenerationGateway for HttpGateway {
    async fn generate_image(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<Vec<Vec<u8>>, GenerationError> {
        let url = self.url(&["model", &request.model_id, "invoke"]);
        let payload = body::image_body(request);

        let response = self
            .send("invoke_model", |c| c.post(url.clone()).json(&payload))
            .await?;
        let images = body::decode_images(&response)?;

        tracing::debug!(model_id = %request.model_id, count = images.len(), "Images generated");
        Ok(images)
    }

    async fn submit_video(
        &self,
        request: &VideoGenerationRequest,
    ) -> Result<JobHandle, GenerationError> {
        let model_id = request
            .model_id
            .as_deref()
            .unwrap_or(&self.config.video_model_id);
        let requested_uri = self.config.video_output_uri();
        // Reused across retries so the service deduplicates the submission.
        let token = random_id();
        let payload = body::start_async_body(
            model_id,
            body::video_model_input(request),
            &requested_uri,
            &token,
        );

        let url = self.url(&["async-invoke"]);
        let response = self
            .send("start_async_invoke", |c| c.post(url.clone()).json(&payload))
            .await?;
        let started: StartAsyncResponse = serde_json::from_value(response)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        // The job-specific output location is only known once the job exists.
        // The job is already running, so a failed read falls back to the
        // location the service derives from the invocation id.
        let output_uri = match self.get_job(&started.invocation_arn).await {
            Ok(JobStatus {
                output_uri: Some(uri),
                ..
            }) => uri,
            Ok(_) => {
                tracing::warn!(
                    invocation_arn = %started.invocation_arn,
                    "Video job has no output location, deriving it",
                );
                derived_output_uri(&requested_uri, &started.invocation_arn)
            }
            Err(e) => {
                tracing::warn!(
                    invocation_arn = %started.invocation_arn,
                    error = %e,
                    "Video job started but its output location could not be read, deriving it",
                );
                derived_output_uri(&requested_uri, &started.invocation_arn)
            }
        };

        tracing::info!(
            invocation_arn = %started.invocation_arn,
            output_uri = %output_uri,
            model_id,
            "Video job submitted",
        );

        Ok(JobHandle {
            invocation_arn: started.invocation_arn,
            output_uri,
        })
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, PollError> {
        Ok(self.get_job(&handle.invocation_arn).await?)
    }

    async fn list_jobs(&self, filter: Option<&JobFilter>) -> Result<Vec<JobStatus>, PollError> {
        let limit = filter.and_then(|f| f.max_results);
        let mut jobs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page_size = limit.unwrap_or(LIST_PAGE_SIZE);
            let page = self.list_page(filter, page_size, next_token.as_deref()).await?;

            for raw in page.async_invoke_summaries {
                match JobStatus::from_raw(raw) {
                    Ok(status) => jobs.push(status),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable job summary"),
                }
            }

            // An explicit limit means a single page.
            match page.next_token {
                Some(token) if limit.is_none() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(jobs)
    }
}
