//! # filehub-core
//!
//! Core crate for FileHub sharing. Contains the object store trait,
//! configuration schemas, audit events, pagination types and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other FileHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind, StorageError};
pub use result::AppResult;
