//! S3-compatible implementation of [`ObjectStore`].
//!
//! Works against MinIO or any S3 endpoint: path-style addressing, presigned
//! PUT URLs, single configured bucket. Credentials come from the standard
//! AWS environment variables.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::debug;

use crate::{ObjectStat, ObjectStore, StorageError};

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client against `endpoint` with path-style addressing and the
    /// ambient AWS credential chain.
    pub async fn connect(endpoint: &str, bucket: &str) -> Self {
        let shared = aws_config::load_from_env().await;
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .endpoint_url(endpoint)
            .force_path_style(true)
            .build();
        debug!(endpoint, bucket, "object store client configured");
        Self::new(aws_sdk_s3::Client::from_conf(config), bucket)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_put(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(request.uri().to_string())
    }

    async fn stat_object(&self, key: &str) -> Result<ObjectStat, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => Ok(ObjectStat {
                size: head.content_length().unwrap_or(0).max(0) as u64,
            }),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Err(StorageError::NotFound(key.to_string()))
                } else {
                    Err(StorageError::Unavailable(service_err.to_string()))
                }
            }
        }
    }

    async fn get_object(&self, key: &str, max_bytes: Option<u64>) -> Result<Vec<u8>, StorageError> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(max) = max_bytes {
            request = request.range(format!("bytes=0-{}", max.saturating_sub(1)));
        }
        match request.send().await {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| StorageError::Unavailable(e.to_string()))?
                    .into_bytes();
                Ok(bytes.to_vec())
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Err(StorageError::NotFound(key.to_string()))
                } else {
                    Err(StorageError::Unavailable(service_err.to_string()))
                }
            }
        }
    }

    async fn remove_object(&self, key: &str) -> Result<(), StorageError> {
        // S3 delete of a missing key is a success; only transport or access
        // failures surface here.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.into_service_error().to_string()))?;
        Ok(())
    }

    async fn bucket_exists(&self) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Unavailable(service_err.to_string()))
                }
            }
        }
    }
}
