//! S3 storage backends

mod aws;
mod ephemeral;
mod traits;

#[cfg(test)]
mod tests;

pub use aws::{client_config, AwsBackend, AwsConnector};
pub use ephemeral::{EphemeralBackend, EphemeralStorage, RecordedRequest, StoredObject};
pub use traits::{
    BackendConnector, CopyObjectResult, ObjectBackend, ObjectBody, ObjectMetadata, ObjectSummary,
    PutObjectResult, StorageError,
};
