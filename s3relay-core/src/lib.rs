//! Core types for s3relay
//!
//! This crate provides the error taxonomy and option handling shared by the
//! storage actions and the command-line front end.

pub mod error;
pub mod options;
pub mod request_id;

pub use error::{ActionError, BackendError, ErrorCode};
pub use options::OptionBag;
pub use request_id::InvocationId;
