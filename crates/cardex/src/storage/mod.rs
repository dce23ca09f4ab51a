//! Blob storage for raw card images.

pub mod filesystem;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StorageError;

pub use filesystem::FileBlobStore;
pub use memory::MemoryBlobStore;

/// Top-level key prefix every card image lives under.
pub const KEY_ROOT: &str = "cards";

/// A read URL that stops being honoured after `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Durable, key-addressed storage for image bytes.
///
/// Keys are generated by the store on `put` and grouped under an owner scope
/// (the card id), so that everything belonging to one card can be removed
/// with a single `delete_prefix`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` and returns the generated storage key.
    async fn put(
        &self,
        owner_scope: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError>;

    async fn get(&self, storage_key: &str) -> Result<Vec<u8>, StorageError>;

    /// Removes every blob stored under `owner_scope`. Missing scopes are not
    /// an error.
    async fn delete_prefix(&self, owner_scope: &str) -> Result<(), StorageError>;

    async fn presign_read(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError>;
}

/// Builds a fresh key `cards/<scope>/<uuid><ext>`.
///
/// The extension comes from the file name, falling back to the content type.
pub fn generate_key(owner_scope: &str, file_name: &str, content_type: &str) -> String {
    let ext = extension_for(file_name, content_type)
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!(
        "{}/{}/{}{}",
        KEY_ROOT,
        owner_scope,
        uuid::Uuid::new_v4(),
        ext
    )
}

/// Prefix shared by all keys of one owner scope, including the trailing `/`.
pub fn scope_prefix(owner_scope: &str) -> String {
    format!("{}/{}/", KEY_ROOT, owner_scope)
}

fn extension_for(file_name: &str, content_type: &str) -> Option<String> {
    let from_name = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase());

    from_name.or_else(|| {
        mime_guess::get_mime_extensions_str(content_type)
            .and_then(|exts| exts.first())
            .map(|e| e.to_string())
    })
}

/// Rejects scopes that could escape the key namespace.
pub fn validate_scope(owner_scope: &str) -> Result<(), StorageError> {
    let valid = !owner_scope.is_empty()
        && owner_scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey {
            key: owner_scope.to_string(),
            reason: "owner scope must be non-empty and contain only [A-Za-z0-9_-]".to_string(),
        })
    }
}

/// Rejects keys that are absolute, traverse upwards, or sit outside
/// [`KEY_ROOT`].
pub fn validate_key(storage_key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: storage_key.to_string(),
        reason: reason.to_string(),
    };

    if storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(invalid("key must be a relative forward-slash path"));
    }
    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("key contains empty or traversal segments"));
    }
    if !storage_key.starts_with(&format!("{}/", KEY_ROOT)) {
        return Err(invalid("key is outside the card namespace"));
    }
    Ok(())
}

pub(crate) fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>, StorageError> {
    let delta = chrono::TimeDelta::from_std(ttl).map_err(|e| StorageError::InvalidTtl(e.to_string()))?;
    Utc::now()
        .checked_add_signed(delta)
        .ok_or_else(|| StorageError::InvalidTtl(format!("{:?} overflows the clock", ttl)))
}
