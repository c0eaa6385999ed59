//! S3-backed object store.

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use gallery_core::error::StorageError;

use crate::cdn::CdnRewrite;
use crate::store::ObjectStore;

/// Connection settings for [`S3ObjectStore::connect`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (MinIO, LocalStack). Enables path-style addressing.
    pub endpoint: Option<String>,
    /// Static access key / secret pair. `None` uses the default provider
    /// chain (env, profile, instance role).
    pub static_credentials: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    cdn: CdnRewrite,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>, cdn: CdnRewrite) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            cdn,
        }
    }

    /// Build an S3 client from settings and the ambient AWS configuration.
    pub async fn connect(settings: S3Settings, cdn: CdnRewrite) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some((access_key, secret_key)) = settings.static_credentials {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        let aws_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(settings.endpoint.is_some())
            .build();

        tracing::info!(
            bucket = %settings.bucket,
            region = %settings.region,
            endpoint = ?settings.endpoint,
            "S3 object store configured"
        );

        Self::new(Client::from_conf(s3_config), settings.bucket, cdn)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::unavailable(e.into_service_error()))?;

        tracing::debug!(bucket = %self.bucket, key, size, "Object uploaded");
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        self.cdn.url(key)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::unavailable(service_error))
                }
            }
        }
    }
}
