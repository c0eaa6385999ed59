use async_trait::async_trait;
use gallery_core::error::StorageError;

/// Blob storage addressed by key, exposed publicly through a CDN.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` under `key` and return the public URL.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<String, StorageError>;

    /// Public URL for `key`. Pure; does not check that the object exists.
    fn public_url(&self, key: &str) -> String;

    /// Whether an object is stored under `key`. A missing object is
    /// `Ok(false)`, never an error.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}
