use std::collections::HashMap;

use async_trait::async_trait;
use gallery_core::error::StorageError;
use tokio::sync::RwLock;

use crate::cdn::CdnRewrite;
use crate::store::ObjectStore;

/// A stored blob and its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// In-process [`ObjectStore`].
#[derive(Debug)]
pub struct MemoryObjectStore {
    cdn: CdnRewrite,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(cdn: CdnRewrite) -> Self {
        Self {
            cdn,
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(StorageError::Rejected("object key must not be empty".into()));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        self.cdn.url(key)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }
}
