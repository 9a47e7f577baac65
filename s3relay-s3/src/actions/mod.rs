//! Storage actions
//!
//! Six independent handlers. Each validates its options, resolves a fresh
//! [`StorageConfig`], connects a backend for that call alone and shapes the
//! backend's answer. Failures are passed through untouched.

mod context;
mod options;

use chrono::{DateTime, Utc};
use s3relay_core::{ActionError, OptionBag};
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use crate::config::{ConnectionOptions, StorageConfig};
use crate::storage::{
    AwsConnector, BackendConnector, CopyObjectResult, ObjectBackend, ObjectBody, ObjectMetadata,
    PutObjectResult,
};

pub use context::CallContext;
pub use options::{
    sniff_content_type, CopyObjectOptions, DeleteFileOptions, ListFilesOptions, PutObjectOptions,
    SignedDownloadOptions, SignedUploadOptions, DEFAULT_EXPIRES_SECS,
};

/// Named actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SignedUpload,
    SignedDownload,
    PutObject,
    ListFiles,
    CopyObject,
    DeleteFile,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Self::SignedUpload,
        Self::SignedDownload,
        Self::PutObject,
        Self::ListFiles,
        Self::CopyObject,
        Self::DeleteFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedUpload => "signed_upload",
            Self::SignedDownload => "signed_download",
            Self::PutObject => "put_object",
            Self::ListFiles => "list_files",
            Self::CopyObject => "copy_object",
            Self::DeleteFile => "delete_file",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    /// Accepts `put_object`, `put-object` and `putObject` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|action| action.as_str().replace('_', "") == normalized)
            .ok_or_else(|| ActionError::validation(format!("Unknown action: {}", s)))
    }
}

/// Result of `put_object`: the backend response plus where the object lives
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObjectResponse {
    #[serde(flatten)]
    pub output: PutObjectResult,
    pub url: String,
    pub bucket: String,
    pub key: String,
}

/// One entry of a `list_files` result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub etag: String,
    pub url: String,
}

/// Result of `delete_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub bucket: String,
    pub key: String,
}

/// Runs storage actions against backends built by a connector
#[derive(Clone)]
pub struct Dispatcher {
    connector: Arc<dyn BackendConnector>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(AwsConnector))
    }
}

impl Dispatcher {
    pub fn new(connector: Arc<dyn BackendConnector>) -> Self {
        Self { connector }
    }

    fn connect(&self, connection: ConnectionOptions) -> (StorageConfig, Arc<dyn ObjectBackend>) {
        let config = connection.resolve();
        debug!(
            region = %config.region,
            endpoint = %config.endpoint,
            provider = %config.provider,
            force_path_style = config.force_path_style,
            "Connecting storage backend"
        );
        let backend = self.connector.connect(&config);
        (config, backend)
    }

    /// Signed URL authorizing one PUT of the object
    pub async fn signed_upload(&self, opts: SignedUploadOptions) -> Result<String, ActionError> {
        let (_, backend) = self.connect(opts.connection);
        let metadata = ObjectMetadata {
            content_type: Some(opts.content_type),
            content_disposition: None,
            acl: opts.acl,
        };

        let url = backend
            .presign_put(&opts.bucket, &opts.key, &metadata, opts.expires)
            .await?;
        Ok(url)
    }

    /// Signed URL authorizing one GET of the object
    pub async fn signed_download(
        &self,
        opts: SignedDownloadOptions,
    ) -> Result<String, ActionError> {
        let (_, backend) = self.connect(opts.connection);
        let url = backend
            .presign_get(&opts.bucket, &opts.key, opts.expires)
            .await?;
        Ok(url)
    }

    pub async fn put_object(
        &self,
        opts: PutObjectOptions,
        ctx: &CallContext,
    ) -> Result<PutObjectResponse, ActionError> {
        let path = ctx.resolve_file(&opts.file, opts.use_file_path)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| ActionError::file_access(&path, e))?;

        let (config, backend) = self.connect(opts.connection);
        let metadata = ObjectMetadata {
            content_type: Some(opts.content_type),
            content_disposition: opts.content_disposition,
            acl: opts.acl,
        };

        let output = backend
            .put_object(&opts.bucket, &opts.key, ObjectBody { path, file }, metadata)
            .await?;

        Ok(PutObjectResponse {
            output,
            url: config.object_url(&opts.bucket, &opts.key),
            bucket: opts.bucket,
            key: opts.key,
        })
    }

    pub async fn list_files(
        &self,
        opts: ListFilesOptions,
    ) -> Result<Vec<ObjectDescriptor>, ActionError> {
        let (config, backend) = self.connect(opts.connection);
        let prefix = Some(opts.prefix.as_str()).filter(|p| !p.is_empty());

        let objects = backend.list_objects(&opts.bucket, prefix).await?;

        Ok(objects
            .into_iter()
            .map(|obj| ObjectDescriptor {
                url: config.object_url(&opts.bucket, &obj.key),
                key: obj.key,
                size: obj.size,
                last_modified: obj.last_modified,
                etag: obj.etag,
            })
            .collect())
    }

    pub async fn copy_object(
        &self,
        opts: CopyObjectOptions,
    ) -> Result<CopyObjectResult, ActionError> {
        let (_, backend) = self.connect(opts.connection);
        let result = backend
            .copy_object(&opts.src_bucket, &opts.src_key, &opts.dst_bucket, &opts.dst_key)
            .await?;
        Ok(result)
    }

    /// Delete without checking that the object exists
    pub async fn delete_file(&self, opts: DeleteFileOptions) -> Result<DeleteResponse, ActionError> {
        let (_, backend) = self.connect(opts.connection);
        backend.delete_object(&opts.bucket, &opts.key).await?;

        Ok(DeleteResponse {
            success: true,
            bucket: opts.bucket,
            key: opts.key,
        })
    }

    /// Run a named action against a loosely-typed option bag
    pub async fn invoke(
        &self,
        action: Action,
        bag: &OptionBag,
        ctx: &CallContext,
    ) -> Result<Value, ActionError> {
        let span = tracing::info_span!("action", %action, invocation = %ctx.invocation_id);

        async {
            let result = self.run(action, bag, ctx).await;
            match &result {
                Ok(_) => info!("Action completed"),
                Err(e) => warn!(kind = e.kind(), error = %e, "Action failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        action: Action,
        bag: &OptionBag,
        ctx: &CallContext,
    ) -> Result<Value, ActionError> {
        match action {
            Action::SignedUpload => {
                let url = self
                    .signed_upload(SignedUploadOptions::from_bag(bag)?)
                    .await?;
                Ok(Value::String(url))
            }
            Action::SignedDownload => {
                let url = self
                    .signed_download(SignedDownloadOptions::from_bag(bag)?)
                    .await?;
                Ok(Value::String(url))
            }
            Action::PutObject => {
                let response = self
                    .put_object(PutObjectOptions::from_bag(bag)?, ctx)
                    .await?;
                to_value(&response)
            }
            Action::ListFiles => {
                let files = self.list_files(ListFilesOptions::from_bag(bag)?).await?;
                to_value(&files)
            }
            Action::CopyObject => {
                let result = self.copy_object(CopyObjectOptions::from_bag(bag)?).await?;
                to_value(&result)
            }
            Action::DeleteFile => {
                let response = self.delete_file(DeleteFileOptions::from_bag(bag)?).await?;
                to_value(&response)
            }
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ActionError> {
    // Result types only hold strings, numbers and timestamps
    serde_json::to_value(value)
        .map_err(|e| ActionError::validation(format!("Failed to encode result: {}", e)))
}
