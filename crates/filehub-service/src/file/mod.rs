//! File operations: metadata, uploads and downloads.

pub mod download;
pub mod service;
pub mod upload;

pub use download::{DownloadGrant, DownloadService};
pub use service::{FileService, UpdateFileRequest};
pub use upload::{BatchUploadReport, UploadRequest, UploadService};
