//! In-memory ephemeral storage backend
//!
//! Used for dry runs and tests. Every connection and request is recorded so
//! callers can check exactly what reached the backend.

use super::traits::*;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use s3relay_core::{BackendError, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use crate::config::StorageConfig;
use crate::url::encode_key;

/// In-memory stored object
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub last_modified: chrono::DateTime<Utc>,
    pub metadata: ObjectMetadata,
}

/// In-memory bucket
struct InMemoryBucket {
    objects: DashMap<String, StoredObject>,
}

impl InMemoryBucket {
    fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }
}

/// A request that reached the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    PresignPut {
        bucket: String,
        key: String,
        metadata: ObjectMetadata,
        expires: Duration,
    },
    PresignGet {
        bucket: String,
        key: String,
        expires: Duration,
    },
    PutObject {
        bucket: String,
        key: String,
        metadata: ObjectMetadata,
    },
    ListObjects {
        bucket: String,
        prefix: Option<String>,
    },
    CopyObject {
        src_bucket: String,
        src_key: String,
        dest_bucket: String,
        dest_key: String,
    },
    DeleteObject {
        bucket: String,
        key: String,
    },
}

#[derive(Default)]
struct Inner {
    buckets: DashMap<String, Arc<InMemoryBucket>>,
    connections: Mutex<Vec<StorageConfig>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Ephemeral (in-memory) storage shared by every backend it connects
#[derive(Clone, Default)]
pub struct EphemeralStorage {
    inner: Arc<Inner>,
}

impl EphemeralStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.inner
            .buckets
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemoryBucket::new()));
    }

    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.inner.buckets.contains_key(bucket)
    }

    /// Store an object directly, bypassing request recording
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.create_bucket(bucket);
        let data = data.into();
        if let Some(bucket_ref) = self.inner.buckets.get(bucket) {
            bucket_ref.objects.insert(
                key.to_string(),
                StoredObject {
                    etag: compute_etag(&data),
                    data,
                    last_modified: Utc::now(),
                    metadata: ObjectMetadata::default(),
                },
            );
        }
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let bucket_ref = self.inner.buckets.get(bucket)?;
        let obj = bucket_ref.objects.get(key)?;
        Some(obj.value().clone())
    }

    /// Configurations passed to `connect`, in order
    pub fn connections(&self) -> Vec<StorageConfig> {
        self.inner.connections.lock().clone()
    }

    /// Requests received by connected backends, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.requests.lock().clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.inner.requests.lock().push(request);
    }

    fn bucket(&self, bucket: &str) -> Result<Arc<InMemoryBucket>, StorageError> {
        self.inner
            .buckets
            .get(bucket)
            .map(|b| Arc::clone(b.value()))
            .ok_or_else(|| {
                BackendError::new(ErrorCode::NoSuchBucket, "The specified bucket does not exist")
                    .with_resource(bucket)
                    .into()
            })
    }
}

impl BackendConnector for EphemeralStorage {
    fn connect(&self, config: &StorageConfig) -> Arc<dyn ObjectBackend> {
        self.inner.connections.lock().push(config.clone());
        Arc::new(EphemeralBackend {
            storage: self.clone(),
            config: config.clone(),
        })
    }
}

/// One connection to an [`EphemeralStorage`]
pub struct EphemeralBackend {
    storage: EphemeralStorage,
    config: StorageConfig,
}

impl EphemeralBackend {
    /// Imitation of a SigV4 query-signed URL; not valid against any real endpoint
    fn fake_signed_url(&self, bucket: &str, key: &str, expires: Duration, op: &str) -> String {
        format!(
            "{}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential={}%2F{}%2Fs3%2Faws4_request&X-Amz-Expires={}&X-Amz-Signature={}&x-id={}",
            self.config.object_url(bucket, key),
            encode_key(&self.config.credentials.access_key_id),
            self.config.region,
            expires.as_secs(),
            compute_signature(&self.config, bucket, key, expires, op),
            op
        )
    }
}

fn compute_etag(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

fn compute_signature(
    config: &StorageConfig,
    bucket: &str,
    key: &str,
    expires: Duration,
    op: &str,
) -> String {
    let mut hasher = Md5::new();
    for part in [
        config.credentials.secret_access_key.as_str(),
        bucket,
        key,
        op,
        &expires.as_secs().to_string(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ObjectBackend for EphemeralBackend {
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
        expires: Duration,
    ) -> Result<String, StorageError> {
        self.storage.record(RecordedRequest::PresignPut {
            bucket: bucket.to_string(),
            key: key.to_string(),
            metadata: metadata.clone(),
            expires,
        });
        Ok(self.fake_signed_url(bucket, key, expires, "PutObject"))
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, StorageError> {
        self.storage.record(RecordedRequest::PresignGet {
            bucket: bucket.to_string(),
            key: key.to_string(),
            expires,
        });
        Ok(self.fake_signed_url(bucket, key, expires, "GetObject"))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        metadata: ObjectMetadata,
    ) -> Result<PutObjectResult, StorageError> {
        self.storage.record(RecordedRequest::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            metadata: metadata.clone(),
        });

        let bucket_ref = self.storage.bucket(bucket)?;

        let ObjectBody { path, mut file } = body;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .await
            .map_err(|source| StorageError::Body { path, source })?;

        let etag = compute_etag(&data);
        bucket_ref.objects.insert(
            key.to_string(),
            StoredObject {
                data: Bytes::from(data),
                etag: etag.clone(),
                last_modified: Utc::now(),
                metadata,
            },
        );

        Ok(PutObjectResult {
            etag: Some(etag),
            ..Default::default()
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        self.storage.record(RecordedRequest::ListObjects {
            bucket: bucket.to_string(),
            prefix: prefix.map(str::to_string),
        });

        let bucket_ref = self.storage.bucket(bucket)?;
        let prefix = prefix.unwrap_or("");

        let mut objects: Vec<ObjectSummary> = bucket_ref
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| ObjectSummary {
                key: entry.key().clone(),
                etag: entry.etag.clone(),
                size: entry.data.len() as u64,
                last_modified: entry.last_modified,
            })
            .collect();

        // Sort by key
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(objects)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<CopyObjectResult, StorageError> {
        self.storage.record(RecordedRequest::CopyObject {
            src_bucket: src_bucket.to_string(),
            src_key: src_key.to_string(),
            dest_bucket: dest_bucket.to_string(),
            dest_key: dest_key.to_string(),
        });

        let src = self
            .storage
            .bucket(src_bucket)?
            .objects
            .get(src_key)
            .map(|obj| obj.value().clone())
            .ok_or_else(|| {
                BackendError::new(ErrorCode::NoSuchKey, "The specified key does not exist.")
                    .with_resource(format!("{}/{}", src_bucket, src_key))
            })?;

        let dest = self.storage.bucket(dest_bucket)?;
        let last_modified = Utc::now();
        let etag = src.etag.clone();
        dest.objects.insert(
            dest_key.to_string(),
            StoredObject {
                last_modified,
                ..src
            },
        );

        Ok(CopyObjectResult {
            etag: Some(etag),
            last_modified: Some(last_modified),
            ..Default::default()
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.storage.record(RecordedRequest::DeleteObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        // S3 reports success whether or not the key existed
        self.storage.bucket(bucket)?.objects.remove(key);
        Ok(())
    }
}
