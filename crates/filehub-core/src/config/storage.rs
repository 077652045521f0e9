//! Object storage and upload configuration.

use serde::{Deserialize, Serialize};

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend driver: `"local"` or `"s3"`.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Lifetime of presigned download URLs in seconds.
    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_seconds: u64,
    /// Default deadline for a single backend call in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            presign_ttl_seconds: default_presign_ttl(),
            operation_timeout_seconds: default_operation_timeout(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local object storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3StorageConfig {
    /// Custom endpoint URL (MinIO and other S3-compatible services).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bucket region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
}

impl Default for S3StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: default_region(),
            bucket: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
        }
    }
}

/// Upload pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of a single file in bytes (default 100 MB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Maximum files stored concurrently within one batch.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Maximum files accepted in one batch.
    #[serde(default = "default_max_batch")]
    pub max_batch_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            max_parallel: default_max_parallel(),
            max_batch_files: default_max_batch(),
        }
    }
}

fn default_driver() -> String {
    "local".to_string()
}

fn default_presign_ttl() -> u64 {
    900
}

fn default_operation_timeout() -> u64 {
    30
}

fn default_local_root() -> String {
    "./data/objects".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_file_size() -> u64 {
    104_857_600 // 100 MB
}

fn default_max_parallel() -> usize {
    8
}

fn default_max_batch() -> usize {
    50
}
