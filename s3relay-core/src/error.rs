//! Action error taxonomy and backend error classification

use std::path::PathBuf;
use thiserror::Error;

/// Error codes reported by S3-compatible backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Auth
    AccessDenied,
    InvalidAccessKeyId,
    InvalidSignature,
    RequestTimeTooSkewed,
    ExpiredToken,

    // Availability
    ServiceUnavailable,
    SlowDown,
    InternalError,

    // Buckets and objects
    NoSuchBucket,
    NoSuchKey,
    InvalidBucketName,
    InvalidArgument,
    InvalidRequest,
    EntityTooLarge,
    PreconditionFailed,

    // Transport failures and anything the backend did not name
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::InvalidSignature => "SignatureDoesNotMatch",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::ExpiredToken => "ExpiredToken",
            Self::ServiceUnavailable => "ServiceUnavailable",
            Self::SlowDown => "SlowDown",
            Self::InternalError => "InternalError",
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::InvalidBucketName => "InvalidBucketName",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidRequest => "InvalidRequest",
            Self::EntityTooLarge => "EntityTooLarge",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::Unknown => "Unknown",
        }
    }

    /// Classify a backend-supplied error code string
    pub fn from_code(code: &str) -> Self {
        match code {
            "AccessDenied" | "Forbidden" => Self::AccessDenied,
            "InvalidAccessKeyId" => Self::InvalidAccessKeyId,
            "SignatureDoesNotMatch" => Self::InvalidSignature,
            "RequestTimeTooSkewed" => Self::RequestTimeTooSkewed,
            "ExpiredToken" => Self::ExpiredToken,
            "ServiceUnavailable" => Self::ServiceUnavailable,
            "SlowDown" => Self::SlowDown,
            "InternalError" => Self::InternalError,
            "NoSuchBucket" => Self::NoSuchBucket,
            "NoSuchKey" | "NotFound" => Self::NoSuchKey,
            "InvalidBucketName" => Self::InvalidBucketName,
            "InvalidArgument" => Self::InvalidArgument,
            "InvalidRequest" => Self::InvalidRequest,
            "EntityTooLarge" => Self::EntityTooLarge,
            "PreconditionFailed" => Self::PreconditionFailed,
            _ => Self::Unknown,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::AccessDenied
            | Self::InvalidAccessKeyId
            | Self::InvalidSignature
            | Self::RequestTimeTooSkewed => Some(403),
            Self::ExpiredToken
            | Self::InvalidBucketName
            | Self::InvalidArgument
            | Self::InvalidRequest
            | Self::EntityTooLarge => Some(400),
            Self::NoSuchBucket | Self::NoSuchKey => Some(404),
            Self::PreconditionFailed => Some(412),
            Self::SlowDown | Self::ServiceUnavailable => Some(503),
            Self::InternalError => Some(500),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by the storage backend, carried to the caller unmodified
///
/// `code` is a coarse classification. The code string and HTTP status the
/// backend actually sent are kept in `raw_code` and `status` when known.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub code: ErrorCode,
    pub message: String,
    pub raw_code: Option<String>,
    pub status: Option<u16>,
    pub resource: Option<String>,
    pub request_id: Option<String>,
}

impl BackendError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            raw_code: None,
            status: None,
            resource: None,
            request_id: None,
        }
    }

    /// Build from the code string a backend reported
    pub fn from_raw_code(raw_code: impl Into<String>, message: impl Into<String>) -> Self {
        let raw_code = raw_code.into();
        Self {
            raw_code: Some(raw_code.clone()),
            ..Self::new(ErrorCode::from_code(&raw_code), message)
        }
    }

    /// Code string as the backend sent it, else the classification
    pub fn code_str(&self) -> &str {
        self.raw_code.as_deref().unwrap_or(self.code.as_str())
    }

    /// HTTP status the backend answered with, else the usual one for the code
    pub fn status_code(&self) -> Option<u16> {
        self.status.or_else(|| self.code.http_status())
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message)
    }
}

impl std::error::Error for BackendError {}

/// Failure of a storage action
///
/// Nothing here is retried or recovered; every variant reaches the caller as-is.
#[derive(Debug, Error)]
pub enum ActionError {
    /// A required field is missing or a field has the wrong type
    #[error("{0}")]
    Validation(String),

    /// The local file backing an upload could not be found or read
    #[error("cannot access file {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage backend rejected the request
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ActionError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Short machine-readable kind, used when reporting failures as JSON
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::FileAccess { .. } => "FileAccessError",
            Self::Backend(_) => "BackendError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_round_trip() {
        for code in [
            ErrorCode::AccessDenied,
            ErrorCode::InvalidSignature,
            ErrorCode::NoSuchBucket,
            ErrorCode::NoSuchKey,
            ErrorCode::SlowDown,
        ] {
            assert_eq!(ErrorCode::from_code(code.as_str()), code);
        }
    }

    #[test]
    fn test_unrecognised_code_is_unknown() {
        let code = ErrorCode::from_code("SomethingNew");
        assert_eq!(code, ErrorCode::Unknown);
        assert_eq!(code.http_status(), None);
    }

    #[test]
    fn test_backend_error_display() {
        let error = BackendError::new(ErrorCode::NoSuchBucket, "The specified bucket does not exist")
            .with_resource("my-bucket")
            .with_request_id("test-request-id");

        assert_eq!(
            error.to_string(),
            "NoSuchBucket: The specified bucket does not exist"
        );
        assert_eq!(error.resource.as_deref(), Some("my-bucket"));
        assert_eq!(error.request_id.as_deref(), Some("test-request-id"));
    }

    #[test]
    fn test_unrecognised_raw_code_is_kept() {
        let error = BackendError::from_raw_code("PermanentRedirect", "Use the eu-west-1 endpoint")
            .with_status(301);

        assert_eq!(error.code, ErrorCode::Unknown);
        assert_eq!(error.code_str(), "PermanentRedirect");
        assert_eq!(error.status_code(), Some(301));
        assert_eq!(
            error.to_string(),
            "PermanentRedirect: Use the eu-west-1 endpoint"
        );
    }

    #[test]
    fn test_raw_code_not_renamed() {
        let error = BackendError::from_raw_code("Forbidden", "Forbidden").with_status(403);
        assert_eq!(error.code, ErrorCode::AccessDenied);
        assert_eq!(error.code_str(), "Forbidden");

        let error = BackendError::from_raw_code("NotFound", "Not Found");
        assert_eq!(error.code, ErrorCode::NoSuchKey);
        assert_eq!(error.code_str(), "NotFound");
        assert_eq!(error.status_code(), Some(404));
    }

    #[test]
    fn test_backend_error_passes_through_action_error() {
        let error: ActionError = BackendError::new(ErrorCode::AccessDenied, "Access Denied").into();
        assert_eq!(error.kind(), "BackendError");
        assert_eq!(error.to_string(), "AccessDenied: Access Denied");
    }

    #[test]
    fn test_file_access_keeps_io_kind() {
        let error = ActionError::file_access(
            "missing.txt",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        match error {
            ActionError::FileAccess { ref source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("expected FileAccess"),
        }
        assert_eq!(error.kind(), "FileAccessError");
    }
}
