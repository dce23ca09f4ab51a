use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

use super::{
    expiry_after, generate_key, scope_prefix, validate_key, validate_scope, BlobStore,
    PresignedUrl,
};

#[derive(Debug, Clone)]
struct StoredBlob {
    content_type: String,
    data: Vec<u8>,
}

/// Process-local blob store. Used in tests and for throwaway runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys stored under `owner_scope`, sorted.
    pub fn keys_in_scope(&self, owner_scope: &str) -> Vec<String> {
        let prefix = scope_prefix(owner_scope);
        self.blobs
            .read()
            .map(|b| {
                b.keys()
                    .filter(|k| k.starts_with(&prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn content_type_of(&self, storage_key: &str) -> Option<String> {
        self.blobs
            .read()
            .ok()?
            .get(storage_key)
            .map(|b| b.content_type.clone())
    }

    /// Drops a single blob, simulating loss in the backend.
    pub fn remove(&self, storage_key: &str) -> bool {
        self.blobs
            .write()
            .map(|mut b| b.remove(storage_key).is_some())
            .unwrap_or(false)
    }
}

fn poisoned() -> StorageError {
    StorageError::Unavailable("blob store lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        owner_scope: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        validate_scope(owner_scope)?;
        let key = generate_key(owner_scope, file_name, content_type);
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        if blobs.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        blobs.insert(
            key.clone(),
            StoredBlob {
                content_type: content_type.to_string(),
                data: data.to_vec(),
            },
        );
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(storage_key)?;
        let blobs = self.blobs.read().map_err(|_| poisoned())?;
        blobs
            .get(storage_key)
            .map(|b| b.data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete_prefix(&self, owner_scope: &str) -> Result<(), StorageError> {
        validate_scope(owner_scope)?;
        let prefix = scope_prefix(owner_scope);
        let mut blobs = self.blobs.write().map_err(|_| poisoned())?;
        blobs.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn presign_read(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        validate_key(storage_key)?;
        let exists = self
            .blobs
            .read()
            .map_err(|_| poisoned())?
            .contains_key(storage_key);
        if !exists {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        let expires_at = expiry_after(ttl)?;
        Ok(PresignedUrl {
            url: format!("memory://{}?expires={}", storage_key, expires_at.timestamp()),
            expires_at,
        })
    }
}
