//! Object-storage capability layer.
//!
//! The control plane talks to an S3-compatible store through the narrow
//! [`ObjectStore`] trait so the upload pipeline and the cleanup worker can be
//! exercised against [`MemoryObjectStore`] in tests. Objects are keyed by
//! resource UUID; the database row is the authoritative ownership record.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

pub mod s3;

pub use s3::S3ObjectStore;

// ---------------------------------------------------------------------------
// Error + stat types
// ---------------------------------------------------------------------------

/// Storage failures. `NotFound` is a definitive answer; everything else is
/// uncertain state — callers with destructive intentions must treat the two
/// differently.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("bucket not found: {0}")]
    BucketNotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Metadata returned by a stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStat {
    pub size: u64,
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

/// Minimal capability surface over the object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presigned PUT URL for uploading `key`, valid for `expires_in`.
    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;

    /// Object metadata; `NotFound` when the key does not exist.
    async fn stat_object(&self, key: &str) -> Result<ObjectStat, StorageError>;

    /// Read up to `max_bytes` of the object (entire object when `None`).
    async fn get_object(&self, key: &str, max_bytes: Option<u64>) -> Result<Vec<u8>, StorageError>;

    /// Delete the object. Deleting a missing key succeeds.
    async fn remove_object(&self, key: &str) -> Result<(), StorageError>;

    /// Whether the configured bucket exists.
    async fn bucket_exists(&self) -> Result<bool, StorageError>;
}

/// Shared handle used across the HTTP layer and the background workers.
pub type DynObjectStore = Arc<dyn ObjectStore>;

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

/// In-memory store for tests: a map of key → bytes plus an availability
/// switch to simulate transport failures.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: RwLock<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, as if a client had PUT it.
    pub async fn put_object(&self, key: &str, bytes: &[u8]) {
        self.objects.write().await.insert(key.to_string(), bytes.to_vec());
    }

    /// Toggle simulated outage: while set, every call fails with
    /// `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    async fn check_available(&self) -> Result<(), StorageError> {
        if *self.unavailable.read().await {
            Err(StorageError::Unavailable("simulated outage".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        self.check_available().await?;
        Ok(format!(
            "memory://upload/{key}?expires={}",
            expires_in.as_secs()
        ))
    }

    async fn stat_object(&self, key: &str) -> Result<ObjectStat, StorageError> {
        self.check_available().await?;
        let objects = self.objects.read().await;
        match objects.get(key) {
            Some(bytes) => Ok(ObjectStat {
                size: bytes.len() as u64,
            }),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }

    async fn get_object(&self, key: &str, max_bytes: Option<u64>) -> Result<Vec<u8>, StorageError> {
        self.check_available().await?;
        let objects = self.objects.read().await;
        let bytes = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let take = max_bytes.map(|m| m as usize).unwrap_or(bytes.len());
        Ok(bytes.iter().take(take).copied().collect())
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        self.check_available().await?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool, StorageError> {
        self.check_available().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stat_and_get_round_trip() {
        let store = MemoryObjectStore::new();
        store.put_object("abc", b"one\ntwo\nthree\n").await;

        let stat = store.stat_object("abc").await.unwrap();
        assert_eq!(stat.size, 14);

        let full = store.get_object("abc", None).await.unwrap();
        assert_eq!(full, b"one\ntwo\nthree\n");

        let prefix = store.get_object("abc", Some(7)).await.unwrap();
        assert_eq!(prefix, b"one\ntwo");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = MemoryObjectStore::new();
        assert!(matches!(
            store.stat_object("nope").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.get_object("nope", None).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_missing_key_succeeds() {
        let store = MemoryObjectStore::new();
        store.remove_object("nope").await.unwrap();
        store.put_object("abc", b"x").await;
        store.remove_object("abc").await.unwrap();
        assert!(!store.contains("abc").await);
    }

    #[tokio::test]
    async fn outage_switch_fails_everything() {
        let store = MemoryObjectStore::new();
        store.put_object("abc", b"x").await;
        store.set_unavailable(true).await;
        assert!(matches!(
            store.stat_object("abc").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            store.remove_object("abc").await,
            Err(StorageError::Unavailable(_))
        ));
        store.set_unavailable(false).await;
        assert!(store.stat_object("abc").await.is_ok());
    }

    #[tokio::test]
    async fn presign_embeds_expiry() {
        let store = MemoryObjectStore::new();
        let url = store
            .presign_put("abc", Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(url.contains("abc"));
        assert!(url.contains("3600"));
    }
}
