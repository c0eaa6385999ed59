use std::time::Duration;

use gallery_cloud::S3Settings;
use gallery_gateway::{GatewayConfig, RetryConfig};

/// Where media records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL for records, S3 for objects.
    Postgres,
    /// In-process maps for both. Nothing survives a restart.
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Some(Self::Postgres),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `300`, long enough for a
    /// blocking image generation).
    pub request_timeout_secs: u64,
    pub store_backend: StoreBackend,
    /// Required for [`StoreBackend::Postgres`].
    pub database_url: Option<String>,
    pub s3: S3Settings,
    /// Public domain serving the bucket.
    pub cdn_domain: String,
    pub gateway: GatewayConfig,
    /// Interval between two polls of the same video job.
    pub poll_interval: Duration,
    /// How long a finished job stays visible as `tracked` on a record.
    pub tracked_retention: Duration,
    /// Regex mapping a job output location to a record id. The object key
    /// below the bucket is used when unset.
    pub job_id_pattern: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                                          |
    /// |--------------------------------|--------------------------------------------------|
    /// | `HOST`                         | `0.0.0.0`                                        |
    /// | `PORT`                         | `3000`                                           |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`                          |
    /// | `REQUEST_TIMEOUT_SECS`         | `300`                                            |
    /// | `STORE_BACKEND`                | `postgres`                                       |
    /// | `DATABASE_URL`                 | none                                             |
    /// | `S3_BUCKET`                    | `gallery-media`                                  |
    /// | `S3_REGION`                    | `us-east-1`                                      |
    /// | `S3_ENDPOINT`                  | none (AWS)                                       |
    /// | `S3_ACCESS_KEY_ID`             | none (default credential chain)                  |
    /// | `S3_SECRET_ACCESS_KEY`         | none                                             |
    /// | `CDN_DOMAIN`                   | `localhost:9000/{S3_BUCKET}`                     |
    /// | `BEDROCK_ENDPOINT`             | `https://bedrock-runtime.us-east-1.amazonaws.com`|
    /// | `BEDROCK_API_KEY`              | none                                             |
    /// | `VIDEO_MODEL_ID`               | `amazon.nova-reel-v1:1`                          |
    /// | `VIDEO_OUTPUT_PREFIX`          | `videos`                                         |
    /// | `GATEWAY_TIMEOUT_SECS`         | `300`                                            |
    /// | `GATEWAY_MAX_RETRIES`          | `4`                                              |
    /// | `RECONCILE_POLL_INTERVAL_SECS` | `30`                                             |
    /// | `TRACKED_JOB_RETENTION_SECS`   | `3600`                                           |
    /// | `JOB_ID_PATTERN`               | none                                             |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let var_or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let host = var_or("HOST", "0.0.0.0");

        let port: u16 = var_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = var_or("REQUEST_TIMEOUT_SECS", "300")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let store_backend = StoreBackend::parse(&var_or("STORE_BACKEND", "postgres"))
            .expect("STORE_BACKEND must be 'postgres' or 'memory'");

        let bucket = var_or("S3_BUCKET", "gallery-media");
        let static_credentials = match (var("S3_ACCESS_KEY_ID"), var("S3_SECRET_ACCESS_KEY")) {
            (Some(key), Some(secret)) => Some((key, secret)),
            _ => None,
        };
        let s3 = S3Settings {
            bucket: bucket.clone(),
            region: var_or("S3_REGION", "us-east-1"),
            endpoint: var("S3_ENDPOINT"),
            static_credentials,
        };
        let cdn_domain = var("CDN_DOMAIN").unwrap_or_else(|| format!("localhost:9000/{bucket}"));

        let gateway_timeout = Duration::from_secs(
            var_or("GATEWAY_TIMEOUT_SECS", "300")
                .parse()
                .expect("GATEWAY_TIMEOUT_SECS must be a valid u64"),
        );
        let max_retries: u32 = var_or("GATEWAY_MAX_RETRIES", "4")
            .parse()
            .expect("GATEWAY_MAX_RETRIES must be a valid u32");
        let defaults = GatewayConfig::default();
        let gateway = GatewayConfig {
            endpoint: var("BEDROCK_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: var("BEDROCK_API_KEY"),
            video_model_id: var("VIDEO_MODEL_ID").unwrap_or(defaults.video_model_id),
            output_bucket: bucket,
            video_prefix: var("VIDEO_OUTPUT_PREFIX").unwrap_or(defaults.video_prefix),
            connect_timeout: gateway_timeout,
            request_timeout: gateway_timeout,
            retry: RetryConfig {
                max_attempts: max_retries.saturating_add(1),
                ..RetryConfig::default()
            },
        };

        let poll_interval = Duration::from_secs(
            var_or("RECONCILE_POLL_INTERVAL_SECS", "30")
                .parse()
                .expect("RECONCILE_POLL_INTERVAL_SECS must be a valid u64"),
        );
        let tracked_retention = Duration::from_secs(
            var_or("TRACKED_JOB_RETENTION_SECS", "3600")
                .parse()
                .expect("TRACKED_JOB_RETENTION_SECS must be a valid u64"),
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            store_backend,
            database_url: var("DATABASE_URL"),
            s3,
            cdn_domain,
            gateway,
            poll_interval,
            tracked_retention,
            job_id_pattern: var("JOB_ID_PATTERN"),
        }
    }
}
