//! File downloads: signed redirect or byte stream.

use std::fmt;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use filehub_core::events::{DomainEvent, EventPayload, FileEvent};
use filehub_core::result::AppResult;
use filehub_core::traits::storage::ByteStream;
use filehub_entity::file::File;
use filehub_entity::permission::CollaboratorRole;
use filehub_storage::StorageManager;

use crate::context::RequestContext;
use crate::permission::PermissionService;

/// How the caller should deliver a file.
pub enum DownloadGrant {
    /// Send the client to a time-limited URL.
    Redirect {
        /// Signed URL.
        url: String,
        /// When the URL stops working.
        expires_at: DateTime<Utc>,
    },
    /// Stream the bytes through.
    Stream {
        /// Object contents.
        stream: ByteStream,
        /// Original file name, for Content-Disposition.
        file_name: String,
        /// MIME type.
        content_type: String,
        /// Size in bytes.
        size_bytes: i64,
    },
}

impl fmt::Debug for DownloadGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redirect { url, expires_at } => f
                .debug_struct("Redirect")
                .field("url", url)
                .field("expires_at", expires_at)
                .finish(),
            Self::Stream {
                file_name,
                content_type,
                size_bytes,
                ..
            } => f
                .debug_struct("Stream")
                .field("file_name", file_name)
                .field("content_type", content_type)
                .field("size_bytes", size_bytes)
                .finish_non_exhaustive(),
        }
    }
}

impl DownloadGrant {
    /// Prepare delivery of `file`: a signed URL when the backend issues
    /// them, an open stream otherwise.
    pub(crate) async fn prepare(
        storage: &StorageManager,
        file: &File,
        deadline: Option<Instant>,
    ) -> AppResult<Self> {
        if storage.issues_signed_urls() {
            let signed = storage.presign(&file.storage_key, deadline).await?;
            return Ok(Self::Redirect {
                url: signed.url,
                expires_at: signed.expires_at,
            });
        }
        let stream = storage.get(&file.storage_key, deadline).await?;
        Ok(Self::Stream {
            stream,
            file_name: file.name.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
        })
    }
}

/// Downloads by authenticated users with view access.
#[derive(Debug, Clone)]
pub struct DownloadService {
    permissions: PermissionService,
    storage: StorageManager,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(permissions: PermissionService, storage: StorageManager) -> Self {
        Self { permissions, storage }
    }

    /// Download a file the caller can view. Share link counters are not
    /// involved.
    pub async fn download(&self, ctx: &RequestContext, file_id: Uuid) -> AppResult<DownloadGrant> {
        let (file, _) = self
            .permissions
            .load_file(ctx, file_id, CollaboratorRole::Viewer)
            .await?;
        let grant = DownloadGrant::prepare(&self.storage, &file, ctx.deadline).await?;

        info!(user_id = ?ctx.user_id(), file_id = %file.id, "File download issued");
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::File(FileEvent::Downloaded { file_id: file.id }),
        )
        .emit();
        Ok(grant)
    }
}
