//! S3-compatible object store.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream as S3Body;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use chrono::Utc;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use filehub_core::config::S3StorageConfig;
use filehub_core::error::StorageError;
use filehub_core::traits::storage::{ByteStream, ObjectStore, PresignedUrl, StorageResult};

use crate::keys::validate_key;

const BACKEND: &str = "s3";

/// Object store backed by an S3 bucket. Downloads are served through
/// SigV4 presigned GET URLs.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build a client from configuration.
    ///
    /// Static keys are used when both are set; otherwise credentials come
    /// from the default AWS provider chain. A custom endpoint switches to
    /// path-style addressing (MinIO and similar).
    pub async fn new(config: &S3StorageConfig) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::backend(
                BACKEND,
                "",
                "init",
                "storage.s3.bucket must be set",
            ));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if !config.access_key.is_empty() && !config.secret_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "filehub-config",
            ));
        }
        let shared = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "Initialized S3 object store"
        );
        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn issues_signed_urls(&self) -> bool {
        true
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok())
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        validate_key(BACKEND, key)?;
        let size = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(S3Body::from(data))
            .send()
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "put", e))?;
        debug!(key, bytes = size, "Stored object in S3");
        Ok(format!("s3://{}/{key}", self.bucket))
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        validate_key(BACKEND, key)?;
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        backend: BACKEND,
                        key: key.to_string(),
                    }
                } else {
                    StorageError::backend(BACKEND, key, "get", e)
                }
            })?;
        Ok(Box::pin(ReaderStream::new(output.body.into_async_read())))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(BACKEND, key)?;
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "delete", e))?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(BACKEND, key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::backend(BACKEND, key, "exists", e)),
        }
    }

    async fn presign(&self, key: &str, ttl: Duration) -> StorageResult<PresignedUrl> {
        validate_key(BACKEND, key)?;
        let signing = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::backend(BACKEND, key, "presign", e))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(signing)
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "presign", e))?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StorageError::backend(BACKEND, key, "presign", e))?;
        Ok(PresignedUrl {
            url: request.uri().to_string(),
            expires_at: Utc::now() + ttl,
        })
    }

    async fn set_visibility(&self, key: &str, public: bool) -> StorageResult<()> {
        validate_key(BACKEND, key)?;
        let acl = if public {
            ObjectCannedAcl::PublicRead
        } else {
            ObjectCannedAcl::Private
        };
        self.client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(key)
            .acl(acl)
            .send()
            .await
            .map_err(|e| StorageError::backend(BACKEND, key, "set_visibility", e))?;
        Ok(())
    }
}
