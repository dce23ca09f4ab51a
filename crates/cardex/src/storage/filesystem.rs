use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

use super::{
    expiry_after, generate_key, validate_key, validate_scope, BlobStore, PresignedUrl, KEY_ROOT,
};

/// Blob store backed by a local directory.
///
/// Keys map one-to-one onto relative paths below `root`.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, storage_key: &str) -> Result<PathBuf, StorageError> {
        validate_key(storage_key)?;
        Ok(storage_key
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.partial", name, uuid::Uuid::new_v4()))
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(
        &self,
        owner_scope: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        validate_scope(owner_scope)?;
        let key = generate_key(owner_scope, file_name, content_type);
        let path = self.path_for(&key)?;

        if let Some(parent) = path.parent() {
            self.ensure_directory(parent).await?;
        }

        // Write next to the target, then link it into place so readers
        // never see a partial blob and an existing key is never replaced.
        let temp_path = temp_path_for(&path);
        if let Err(e) = write_synced(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::WriteFile {
                path: temp_path,
                source: e,
            });
        }

        let linked = tokio::fs::hard_link(&temp_path, &path).await;
        let _ = tokio::fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists(key));
            }
            Err(e) => return Err(StorageError::WriteFile { path, source: e }),
        }

        log::debug!("Stored blob {} ({} bytes)", key, data.len());
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(storage_key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFile { path, source: e }),
        }
    }

    async fn delete_prefix(&self, owner_scope: &str) -> Result<(), StorageError> {
        validate_scope(owner_scope)?;
        let dir = self.root.join(KEY_ROOT).join(owner_scope);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                log::debug!("Deleted blob scope {}", owner_scope);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Delete {
                path: dir,
                source: e,
            }),
        }
    }

    /// Local files can't enforce an expiry; the stamp is advisory for callers
    /// that hand the URL on.
    async fn presign_read(
        &self,
        storage_key: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        let path = self.path_for(storage_key)?;
        match tokio::fs::metadata(&path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()));
            }
            Err(e) => return Err(StorageError::ReadFile { path, source: e }),
        }

        let absolute = std::path::absolute(&path).map_err(|e| StorageError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(PresignedUrl {
            url: format!("file://{}", absolute.display()),
            expires_at: expiry_after(ttl)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let key = store
            .put("card-1", "front.png", "image/png", b"png bytes")
            .await
            .unwrap();

        assert!(key.starts_with("cards/card-1/"));
        assert!(temp_dir.path().join(&key).exists());
        assert_eq!(store.get(&key).await.unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_put_leaves_no_partial_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let key = store
            .put("card-2", "front.jpg", "image/jpeg", b"jpeg bytes")
            .await
            .unwrap();

        let scope = temp_dir.path().join("cards").join("card-2");
        let names: Vec<String> = std::fs::read_dir(&scope)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(key.ends_with(&names[0]));
    }

    #[tokio::test]
    async fn test_link_never_replaces_existing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("cards").join("c").join("taken.png");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"original").unwrap();

        let temp = temp_path_for(&target);
        write_synced(&temp, b"replacement").await.unwrap();
        let linked = tokio::fs::hard_link(&temp, &target).await;
        assert_eq!(
            linked.unwrap_err().kind(),
            std::io::ErrorKind::AlreadyExists
        );
        assert_eq!(std::fs::read(&target).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_same_file_name_gets_distinct_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let first = store.put("c", "card.jpg", "image/jpeg", b"1").await.unwrap();
        let second = store.put("c", "card.jpg", "image/jpeg", b"2").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.get(&first).await.unwrap(), b"1");
        assert_eq!(store.get(&second).await.unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_get_missing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let result = store.get("cards/none/missing.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_rejects_traversal_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let result = store.get("cards/../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey { .. })));
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_only_that_scope() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let doomed = store.put("a", "1.png", "image/png", b"a").await.unwrap();
        let kept = store.put("b", "1.png", "image/png", b"b").await.unwrap();

        store.delete_prefix("a").await.unwrap();

        assert!(matches!(
            store.get(&doomed).await,
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(store.get(&kept).await.unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_delete_missing_prefix_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());
        store.delete_prefix("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_presign_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());
        let key = store.put("c", "f.webp", "image/webp", b"w").await.unwrap();

        let before = Utc::now();
        let url = store
            .presign_read(&key, Duration::from_secs(900))
            .await
            .unwrap();

        assert!(url.url.starts_with("file://"));
        assert!(url.url.ends_with(".webp"));
        assert!(url.expires_at >= before + chrono::TimeDelta::seconds(899));
    }

    #[tokio::test]
    async fn test_presign_missing_blob() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let result = store
            .presign_read("cards/c/missing.png", Duration::from_secs(60))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileBlobStore::new(temp_dir.path());

        let key = store.put("c", "empty.bin", "application/octet-stream", &[]).await.unwrap();
        assert!(store.get(&key).await.unwrap().is_empty());
    }
}
