//! Object store with pluggable backends
//!
//! The S3 backend is used in production; the local filesystem backend
//! keeps development and tests hermetic.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{StorageConfig, StorageProvider};
use crate::error::StorageError;

use super::s3_client::S3Client;
use super::types::{ObjectMetadata, StorageObject};

type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// Storage Backend Trait
// ============================================================================

/// Trait for object storage backends
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store an object
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Fetch an object with its metadata
    async fn get(&self, key: &str) -> Result<StorageObject>;

    /// Fetch metadata only
    async fn head(&self, key: &str) -> Result<ObjectMetadata>;

    /// Delete an object; deleting a missing object is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> Result<bool>;
}

// ============================================================================
// Object Store (Main Implementation)
// ============================================================================

/// Main object store with pluggable backends
#[derive(Clone)]
pub struct ObjectStore {
    inner: Arc<dyn StorageBackend>,
}

impl ObjectStore {
    /// Create with local filesystem storage
    pub fn with_local(base_path: PathBuf) -> Self {
        Self {
            inner: Arc::new(LocalStorage::new(base_path)),
        }
    }

    /// Create with S3 storage
    pub fn with_s3(client: S3Client) -> Self {
        Self {
            inner: Arc::new(S3Storage::new(client)),
        }
    }

    /// Build the backend selected by configuration
    pub async fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.provider {
            StorageProvider::Local => {
                tracing::info!("Using local object storage at {}", config.local_dir);
                Ok(Self::with_local(PathBuf::from(&config.local_dir)))
            }
            _ => {
                let client = S3Client::new(config).await?;
                Ok(Self::with_s3(client))
            }
        }
    }

    pub async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.inner.put(key, data, content_type).await
    }

    pub async fn get(&self, key: &str) -> Result<StorageObject> {
        self.inner.get(key).await
    }

    pub async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.inner.head(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }
}

// ============================================================================
// Local Filesystem Storage
// ============================================================================

/// Local filesystem object storage
///
/// Keys are server-generated (`pdfs/{uuid}.pdf`), never user input,
/// so they map directly onto paths under the base directory.
struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StorageObject> {
        let metadata = self.head(key).await?;

        let data = tokio::fs::read(self.object_path(key))
            .await
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", key, e)))?;

        Ok(StorageObject { metadata, data })
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        let path = self.object_path(key);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::ObjectNotFound(key.to_string()));
            }
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        let last_modified = meta
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t));

        Ok(ObjectMetadata {
            key: key.to_string(),
            size: meta.len() as i64,
            last_modified,
            content_type: None,
            etag: None,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.object_path(key)).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match tokio::fs::metadata(self.object_path(key)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }
}

// ============================================================================
// S3 Storage
// ============================================================================

/// S3-backed object storage
struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl StorageBackend for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.client.put_object(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<StorageObject> {
        self.client.get_object(key).await
    }

    async fn head(&self, key: &str) -> Result<ObjectMetadata> {
        self.client.head_object(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.delete_object(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.client.object_exists(key).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_put_get_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::with_local(temp_dir.path().to_path_buf());

        store
            .put("texts/abc.txt", b"hello words".to_vec(), "text/plain")
            .await
            .unwrap();

        let obj = store.get("texts/abc.txt").await.unwrap();
        assert_eq!(obj.data, b"hello words");
        assert_eq!(obj.metadata.size, 11);
    }

    #[tokio::test]
    async fn test_local_missing_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::with_local(temp_dir.path().to_path_buf());

        let err = store.get("pdfs/nope.pdf").await.unwrap_err();
        assert!(matches!(err, StorageError::ObjectNotFound(_)));
        assert!(!store.exists("pdfs/nope.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::with_local(temp_dir.path().to_path_buf());

        store
            .put("pdfs/x.pdf", b"%PDF-".to_vec(), "application/pdf")
            .await
            .unwrap();

        store.delete("pdfs/x.pdf").await.unwrap();
        store.delete("pdfs/x.pdf").await.unwrap();
        assert!(!store.exists("pdfs/x.pdf").await.unwrap());
    }
}
