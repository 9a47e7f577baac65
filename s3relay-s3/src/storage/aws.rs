//! Storage backend backed by the AWS S3 SDK

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::RequestId;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use s3relay_core::{BackendError, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::traits::*;
use crate::config::StorageConfig;
use crate::url::copy_source;

const CREDENTIALS_PROVIDER: &str = "s3relay";

/// Connects a fresh SDK client for every configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsConnector;

impl BackendConnector for AwsConnector {
    fn connect(&self, config: &StorageConfig) -> Arc<dyn ObjectBackend> {
        Arc::new(AwsBackend::new(config))
    }
}

/// S3 backend over `aws-sdk-s3`
pub struct AwsBackend {
    client: Client,
}

impl AwsBackend {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::from_conf(client_config(config)),
        }
    }
}

/// SDK configuration for a resolved storage config
///
/// Credentials are static; the SDK's environment and profile chain is never
/// consulted.
pub fn client_config(config: &StorageConfig) -> aws_sdk_s3::Config {
    let credentials = Credentials::new(
        &config.credentials.access_key_id,
        &config.credentials.secret_access_key,
        None,
        None,
        CREDENTIALS_PROVIDER,
    );

    aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .force_path_style(config.force_path_style)
        .build()
}

fn presigning_config(expires: Duration) -> Result<PresigningConfig, StorageError> {
    PresigningConfig::expires_in(expires).map_err(|e| {
        BackendError::new(
            ErrorCode::InvalidArgument,
            format!("Invalid presigning expiry: {}", e),
        )
        .into()
    })
}

/// Map an SDK failure onto the backend error type without altering its meaning
fn sdk_error<E>(err: SdkError<E, HttpResponse>, resource: String) -> StorageError
where
    E: ProvideErrorMetadata + RequestId + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let (code, message, request_id) = match err.as_service_error() {
        Some(service) => (
            service.code().map(str::to_string),
            service.message().map(str::to_string),
            service.request_id().map(str::to_string),
        ),
        None => (None, None, None),
    };

    let message = message.unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    backend_error(code, message, status, request_id, resource).into()
}

fn backend_error(
    code: Option<String>,
    message: String,
    status: Option<u16>,
    request_id: Option<String>,
    resource: String,
) -> BackendError {
    let mut error = match code {
        Some(code) => BackendError::from_raw_code(code, message),
        None => BackendError::new(ErrorCode::Unknown, message),
    }
    .with_resource(resource);

    if let Some(status) = status {
        error = error.with_status(status);
    }
    if let Some(request_id) = request_id {
        error = error.with_request_id(request_id);
    }
    error
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl ObjectBackend for AwsBackend {
    async fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
        expires: Duration,
    ) -> Result<String, StorageError> {
        debug!(bucket, key, expires = expires.as_secs(), "Presigning PutObject");

        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .set_content_type(metadata.content_type.clone())
            .set_content_disposition(metadata.content_disposition.clone())
            .set_acl(metadata.acl.as_deref().map(ObjectCannedAcl::from))
            .presigned(presigning_config(expires)?)
            .await
            .map_err(|e| sdk_error(e, format!("{}/{}", bucket, key)))?;

        Ok(presigned.uri().to_string())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires: Duration,
    ) -> Result<String, StorageError> {
        debug!(bucket, key, expires = expires.as_secs(), "Presigning GetObject");

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config(expires)?)
            .await
            .map_err(|e| sdk_error(e, format!("{}/{}", bucket, key)))?;

        Ok(presigned.uri().to_string())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ObjectBody,
        metadata: ObjectMetadata,
    ) -> Result<PutObjectResult, StorageError> {
        let ObjectBody { path, file } = body;
        debug!(bucket, key, path = %path.display(), "PutObject");

        let stream = ByteStream::read_from()
            .file(file)
            .build()
            .await
            .map_err(|e| StorageError::Body {
                path: path.clone(),
                source: std::io::Error::other(e),
            })?;

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(stream)
            .set_content_type(metadata.content_type)
            .set_content_disposition(metadata.content_disposition)
            .set_acl(metadata.acl.as_deref().map(ObjectCannedAcl::from))
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("{}/{}", bucket, key)))?;

        Ok(PutObjectResult {
            etag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
            checksum_crc32: output.checksum_crc32().map(str::to_string),
            server_side_encryption: output
                .server_side_encryption()
                .map(|s| s.as_str().to_string()),
        })
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            debug!(bucket, prefix = ?prefix, page = ?continuation_token, "ListObjectsV2");

            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_prefix(prefix.map(str::to_string))
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(e, bucket.to_string()))?;

            for object in output.contents() {
                let Some(key) = object.key() else { continue };
                objects.push(ObjectSummary {
                    key: key.to_string(),
                    etag: object.e_tag().unwrap_or_default().to_string(),
                    size: u64::try_from(object.size().unwrap_or_default()).unwrap_or_default(),
                    last_modified: object
                        .last_modified()
                        .and_then(to_chrono)
                        .unwrap_or_default(),
                });
            }

            match output.next_continuation_token() {
                Some(token) if !token.is_empty() => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<CopyObjectResult, StorageError> {
        let source = copy_source(src_bucket, src_key);
        debug!(source = %source, dest_bucket, dest_key, "CopyObject");

        let output = self
            .client
            .copy_object()
            .copy_source(source)
            .bucket(dest_bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("{}/{}", dest_bucket, dest_key)))?;

        let result = output.copy_object_result();
        Ok(CopyObjectResult {
            etag: result.and_then(|r| r.e_tag()).map(str::to_string),
            last_modified: result.and_then(|r| r.last_modified()).and_then(to_chrono),
            version_id: output.version_id().map(str::to_string),
            copy_source_version_id: output.copy_source_version_id().map(str::to_string),
        })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        debug!(bucket, key, "DeleteObject");

        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error(e, format!("{}/{}", bucket, key)))?;

        Ok(())
    }
}
