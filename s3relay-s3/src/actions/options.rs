//! Typed action options
//!
//! Each struct is built from an option bag in one pass. Required fields are
//! checked before anything else happens, so a bad bag never reaches a backend.

use s3relay_core::{ActionError, OptionBag};
use std::time::Duration;

use crate::config::ConnectionOptions;

/// Signed URLs stay valid for five minutes unless told otherwise
pub const DEFAULT_EXPIRES_SECS: u64 = 300;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// MIME type for a key based on its extension
pub fn sniff_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

fn required_bucket(bag: &OptionBag) -> Result<String, ActionError> {
    bag.required_str("bucket", "Bucket is required")
}

fn required_key(bag: &OptionBag) -> Result<String, ActionError> {
    bag.required_str("key", "Key is required")
}

#[derive(Debug, Clone)]
pub struct SignedUploadOptions {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub expires: Duration,
    pub acl: Option<String>,
    pub connection: ConnectionOptions,
}

impl SignedUploadOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        let bucket = required_bucket(bag)?;
        let key = required_key(bag)?;
        let content_type = match bag.optional_string("contentType")? {
            Some(ct) if !ct.is_empty() => ct,
            _ => sniff_content_type(&key),
        };

        Ok(Self {
            content_type,
            expires: Duration::from_secs(bag.optional_u64("expires", DEFAULT_EXPIRES_SECS)?),
            acl: bag.optional_string("acl")?.filter(|a| !a.is_empty()),
            connection: ConnectionOptions::from_bag(bag)?,
            bucket,
            key,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SignedDownloadOptions {
    pub bucket: String,
    pub key: String,
    pub expires: Duration,
    pub connection: ConnectionOptions,
}

impl SignedDownloadOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        Ok(Self {
            bucket: required_bucket(bag)?,
            key: required_key(bag)?,
            expires: Duration::from_secs(bag.optional_u64("expires", DEFAULT_EXPIRES_SECS)?),
            connection: ConnectionOptions::from_bag(bag)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PutObjectOptions {
    /// Temp-file name, or a path relative to the working directory when `use_file_path` is set
    pub file: String,
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub acl: Option<String>,
    pub content_disposition: Option<String>,
    pub use_file_path: bool,
    pub connection: ConnectionOptions,
}

impl PutObjectOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        let file = bag.required_str("file", "File is required")?;
        let bucket = required_bucket(bag)?;
        let key = required_key(bag)?;
        let content_type = match bag.optional_string("contentType")? {
            Some(ct) if !ct.is_empty() => ct,
            _ => sniff_content_type(&key),
        };

        Ok(Self {
            content_type,
            acl: bag.optional_string("acl")?.filter(|a| !a.is_empty()),
            content_disposition: bag
                .optional_string("contentDisposition")?
                .filter(|d| !d.is_empty()),
            use_file_path: bag.optional_bool("useFilePath", false)?,
            connection: ConnectionOptions::from_bag(bag)?,
            file,
            bucket,
            key,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ListFilesOptions {
    pub bucket: String,
    pub prefix: String,
    pub connection: ConnectionOptions,
}

impl ListFilesOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        Ok(Self {
            bucket: required_bucket(bag)?,
            prefix: bag.optional_str("prefix", "")?,
            connection: ConnectionOptions::from_bag(bag)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CopyObjectOptions {
    pub src_bucket: String,
    pub src_key: String,
    pub dst_bucket: String,
    pub dst_key: String,
    pub connection: ConnectionOptions,
}

impl CopyObjectOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        Ok(Self {
            src_bucket: bag.required_str("srcBucket", "Source bucket is required")?,
            src_key: bag.required_str("srcKey", "Source key is required")?,
            dst_bucket: bag.required_str("dstBucket", "Destination bucket is required")?,
            dst_key: bag.required_str("dstKey", "Destination key is required")?,
            connection: ConnectionOptions::from_bag(bag)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFileOptions {
    pub bucket: String,
    pub key: String,
    pub connection: ConnectionOptions,
}

impl DeleteFileOptions {
    pub fn from_bag(bag: &OptionBag) -> Result<Self, ActionError> {
        Ok(Self {
            bucket: required_bucket(bag)?,
            key: required_key(bag)?,
            connection: ConnectionOptions::from_bag(bag)?,
        })
    }
}
