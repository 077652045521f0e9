//! Core type definitions used across the FileHub workspace.

pub mod pagination;

pub use pagination::{PageRequest, PageResponse};
