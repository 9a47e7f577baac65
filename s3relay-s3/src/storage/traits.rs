//! Storage backend traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use s3relay_core::{ActionError, BackendError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::StorageConfig;

/// Errors from storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Service(#[from] BackendError),

    #[error("Failed to read object body from {}: {source}", .path.display())]
    Body {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<StorageError> for ActionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Service(e) => ActionError::Backend(e),
            StorageError::Body { path, source } => ActionError::file_access(path, source),
        }
    }
}

/// Object metadata sent with uploads and signed upload URLs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub acl: Option<String>,
}

/// An opened local file to stream as an object body
#[derive(Debug)]
pub struct ObjectBody {
    pub path: PathBuf,
    pub file: tokio::fs::File,
}

/// Result of a PUT operation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectResult {
    pub etag: Option<String>,
    pub version_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum_crc32: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_encryption: Option<String>,
}

/// Result of a COPY operation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyObjectResult {
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub version_id: Option<String>,
    pub copy_source_version_id: Option<String>,
}

/// Summary of an object in a listing
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub etag: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Abstract storage backend trait
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Sign a PUT of `key` valid for `expires`
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
        expires: Duration,
    ) -> Result<String, StorageError>;

    /// Sign a GET of `key` valid for `expires`
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, StorageError>;

    /// Put an object, consuming the whole body before returning
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        metadata: ObjectMetadata,
    ) -> Result<PutObjectResult, StorageError>;

    /// List every object under `prefix`
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Copy an object
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<CopyObjectResult, StorageError>;

    /// Delete an object
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
}

/// Builds a backend handle for one resolved configuration
pub trait BackendConnector: Send + Sync {
    fn connect(&self, config: &StorageConfig) -> Arc<dyn ObjectBackend>;
}
