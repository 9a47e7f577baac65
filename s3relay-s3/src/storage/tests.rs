//! Tests for the in-memory storage backend

use super::*;
use crate::config::{Credentials, Provider, StorageConfig};
use s3relay_core::ErrorCode;
use std::io::Write;
use std::time::Duration;

fn config() -> StorageConfig {
    StorageConfig {
        region: "us-east-1".into(),
        credentials: Credentials {
            access_key_id: "AK".into(),
            secret_access_key: "SK".into(),
        },
        endpoint: "https://s3.us-east-1.amazonaws.com".into(),
        force_path_style: false,
        provider: Provider::Aws,
    }
}

/// Test helper to create storage and a connected backend
fn storage() -> (EphemeralStorage, std::sync::Arc<dyn ObjectBackend>) {
    let s = EphemeralStorage::new();
    let backend = s.connect(&config());
    (s, backend)
}

async fn body(contents: &[u8]) -> (tempfile::NamedTempFile, ObjectBody) {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(contents).unwrap();
    tmp.flush().unwrap();
    let file = tokio::fs::File::open(tmp.path()).await.unwrap();
    let body = ObjectBody {
        path: tmp.path().to_path_buf(),
        file,
    };
    (tmp, body)
}

fn service_code(err: StorageError) -> ErrorCode {
    match err {
        StorageError::Service(e) => e.code,
        other => panic!("expected service error, got {other:?}"),
    }
}

// =============================================================================
// CONNECTIONS
// =============================================================================

mod connection_tests {
    use super::*;

    #[test]
    fn test_connect_records_config() {
        let (s, _backend) = storage();
        assert_eq!(s.connections(), vec![config()]);
        assert!(s.requests().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let s = EphemeralStorage::new();
        let other = s.clone();
        other.create_bucket("shared");
        assert!(s.bucket_exists("shared"));
    }
}

// =============================================================================
// OBJECT OPERATIONS
// =============================================================================

mod object_tests {
    use super::*;

    #[tokio::test]
    async fn test_put_object_simple() {
        let (s, backend) = storage();
        s.create_bucket("bucket");

        let (_tmp, b) = body(b"hello").await;
        let result = backend
            .put_object("bucket", "key", b, ObjectMetadata::default())
            .await
            .unwrap();

        let etag = result.etag.unwrap();
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(&s.get_object("bucket", "key").unwrap().data[..], b"hello");
    }

    #[tokio::test]
    async fn test_put_object_keeps_metadata() {
        let (s, backend) = storage();
        s.create_bucket("bucket");

        let metadata = ObjectMetadata {
            content_type: Some("text/plain".into()),
            content_disposition: Some("attachment".into()),
            acl: Some("public-read".into()),
        };
        let (_tmp, b) = body(b"x").await;
        backend
            .put_object("bucket", "key", b, metadata.clone())
            .await
            .unwrap();

        assert_eq!(s.get_object("bucket", "key").unwrap().metadata, metadata);
    }

    #[tokio::test]
    async fn test_put_object_bucket_not_found() {
        let (_s, backend) = storage();
        let (_tmp, b) = body(b"data").await;
        let err = backend
            .put_object("nonexistent", "key", b, ObjectMetadata::default())
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ErrorCode::NoSuchBucket);
    }

    #[tokio::test]
    async fn test_delete_object_exists() {
        let (s, backend) = storage();
        s.insert_object("bucket", "key", "data");

        backend.delete_object("bucket", "key").await.unwrap();
        assert!(s.get_object("bucket", "key").is_none());
    }

    #[tokio::test]
    async fn test_delete_object_not_exists() {
        let (s, backend) = storage();
        s.create_bucket("bucket");

        // S3 returns success even for non-existent keys
        backend.delete_object("bucket", "nonexistent").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_object_bucket_not_found() {
        let (_s, backend) = storage();
        let err = backend.delete_object("nonexistent", "key").await.unwrap_err();
        assert_eq!(service_code(err), ErrorCode::NoSuchBucket);
    }

    #[tokio::test]
    async fn test_copy_object() {
        let (s, backend) = storage();
        s.insert_object("src", "a.txt", "payload");
        s.create_bucket("dst");

        let result = backend
            .copy_object("src", "a.txt", "dst", "b.txt")
            .await
            .unwrap();

        let copied = s.get_object("dst", "b.txt").unwrap();
        assert_eq!(&copied.data[..], b"payload");
        assert_eq!(result.etag.as_deref(), Some(copied.etag.as_str()));
        assert!(result.last_modified.is_some());
        // Source is untouched
        assert!(s.get_object("src", "a.txt").is_some());
    }

    #[tokio::test]
    async fn test_copy_object_missing_source() {
        let (s, backend) = storage();
        s.create_bucket("src");
        s.create_bucket("dst");

        let err = backend
            .copy_object("src", "missing", "dst", "b.txt")
            .await
            .unwrap_err();
        assert_eq!(service_code(err), ErrorCode::NoSuchKey);
    }
}

// =============================================================================
// LISTING
// =============================================================================

mod list_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_empty_bucket() {
        let (s, backend) = storage();
        s.create_bucket("bucket");

        let objects = backend.list_objects("bucket", None).await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn test_list_with_prefix_sorted() {
        let (s, backend) = storage();
        s.insert_object("bucket", "logs/b.txt", "bb");
        s.insert_object("bucket", "logs/a.txt", "a");
        s.insert_object("bucket", "other.txt", "ccc");

        let objects = backend.list_objects("bucket", Some("logs/")).await.unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["logs/a.txt", "logs/b.txt"]);
        assert_eq!(objects[1].size, 2);
    }

    #[tokio::test]
    async fn test_list_bucket_not_found() {
        let (_s, backend) = storage();
        let err = backend.list_objects("nonexistent", None).await.unwrap_err();
        assert_eq!(service_code(err), ErrorCode::NoSuchBucket);
    }
}

// =============================================================================
// SIGNED URLS
// =============================================================================

mod presign_tests {
    use super::*;

    #[tokio::test]
    async fn test_presign_get_records_expiry() {
        let (s, backend) = storage();

        let url = backend
            .presign_get("bucket", "a b.txt", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(url.starts_with("https://bucket.s3.us-east-1.amazonaws.com/a%20b.txt?"));
        assert!(url.contains("X-Amz-Expires=60"));
        assert!(url.contains("x-id=GetObject"));
        assert_eq!(
            s.requests(),
            vec![RecordedRequest::PresignGet {
                bucket: "bucket".into(),
                key: "a b.txt".into(),
                expires: Duration::from_secs(60),
            }]
        );
    }

    #[tokio::test]
    async fn test_presign_put_is_deterministic() {
        let (_s, backend) = storage();
        let metadata = ObjectMetadata::default();

        let first = backend
            .presign_put("bucket", "k", &metadata, Duration::from_secs(300))
            .await
            .unwrap();
        let second = backend
            .presign_put("bucket", "k", &metadata, Duration::from_secs(300))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first.contains("x-id=PutObject"));
    }
}
