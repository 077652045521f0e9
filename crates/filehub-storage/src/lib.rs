//! # filehub-storage
//!
//! Object store backends for FileHub: local filesystem, S3 (behind the `s3`
//! feature) and in-memory. Also owns object key layout and storage
//! deadlines.

pub mod deadline;
pub mod keys;
pub mod manager;
pub mod providers;

pub use keys::object_key;
pub use manager::StorageManager;
pub use providers::{LocalObjectStore, MemoryObjectStore};
