//! S3 actions for s3relay
//!
//! This crate resolves storage configuration, builds object URLs and runs the
//! signed-URL, put, list, copy and delete actions against an S3-compatible
//! backend.

pub mod actions;
pub mod config;
pub mod storage;
pub mod url;

pub use actions::{Action, CallContext, Dispatcher};
pub use config::{AddressingMode, ConnectionOptions, Credentials, Provider, StorageConfig};
pub use storage::{AwsConnector, BackendConnector, EphemeralStorage, ObjectBackend};
pub use url::build_file_url;
