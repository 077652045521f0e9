//! Shared test helpers for integration tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use uuid::Uuid;

use filehub_core::config::{SharingConfig, TrashConfig, UploadConfig};
use filehub_database::MemoryDatabase;
use filehub_entity::file::File;
use filehub_entity::folder::Folder;
use filehub_entity::permission::ResourceRef;
use filehub_entity::share::{ShareLink, SharePermission};
use filehub_service::file::UploadRequest;
use filehub_service::folder::CreateFolderRequest;
use filehub_service::share::CreateShareLinkRequest;
use filehub_service::{DownloadGrant, RequestContext, Services, Stores};
use filehub_storage::{MemoryObjectStore, StorageManager};

/// Test application context
pub struct TestApp {
    /// Every service, wired over the in-memory backends
    pub services: Services,
    /// Direct handle on the object store
    pub objects: MemoryObjectStore,
    /// Direct handle on the database
    pub db: MemoryDatabase,
}

impl TestApp {
    /// Create a new test application with default settings
    pub fn new() -> Self {
        Self::build(MemoryObjectStore::new(), SharingConfig::default())
    }

    /// Test application with custom sharing settings
    pub fn with_sharing(sharing: SharingConfig) -> Self {
        Self::build(MemoryObjectStore::new(), sharing)
    }

    /// Test application over a prepared object store
    pub fn with_objects(objects: MemoryObjectStore) -> Self {
        Self::build(objects, SharingConfig::default())
    }

    /// Test application over stores built from `db`, some of them wrapped
    pub fn with_stores(db: MemoryDatabase, stores: Stores) -> Self {
        Self::assemble(db, stores, MemoryObjectStore::new(), SharingConfig::default())
    }

    fn build(objects: MemoryObjectStore, sharing: SharingConfig) -> Self {
        let db = MemoryDatabase::new();
        Self::assemble(db.clone(), Stores::memory(db), objects, sharing)
    }

    fn assemble(
        db: MemoryDatabase,
        stores: Stores,
        objects: MemoryObjectStore,
        sharing: SharingConfig,
    ) -> Self {
        let storage = StorageManager::new(
            Arc::new(objects.clone()),
            Duration::from_secs(900),
            Duration::from_secs(30),
        );
        let services = Services::new(
            stores,
            storage,
            sharing,
            UploadConfig::default(),
            TrashConfig::default(),
        );
        Self {
            services,
            objects,
            db,
        }
    }

    /// Create a folder
    pub async fn folder(&self, ctx: &RequestContext, parent_id: Option<Uuid>, name: &str) -> Folder {
        self.services
            .folders
            .create_folder(
                ctx,
                CreateFolderRequest {
                    parent_id,
                    name: name.to_string(),
                    color: None,
                },
            )
            .await
            .expect("create folder")
    }

    /// Upload a small text file
    pub async fn upload(&self, ctx: &RequestContext, folder_id: Option<Uuid>, name: &str) -> File {
        self.services
            .uploads
            .upload(ctx, upload_request(folder_id, name, "hello"))
            .await
            .expect("upload")
    }

    /// Create a share link on `resource`
    pub async fn link(
        &self,
        ctx: &RequestContext,
        resource: ResourceRef,
        max_downloads: i32,
        password: Option<&str>,
    ) -> ShareLink {
        self.services
            .shares
            .create_link(
                ctx,
                CreateShareLinkRequest {
                    resource,
                    password: password.map(str::to_owned),
                    permission: SharePermission::View,
                    allow_download: true,
                    description: None,
                    expires_at: None,
                    max_downloads,
                },
            )
            .await
            .expect("create link")
    }

    /// Current file record, trashed or not
    pub async fn file_record(&self, id: Uuid) -> Option<File> {
        self.services.stores.files.find_by_id(id).await.expect("find file")
    }

    /// Current folder record, trashed or not
    pub async fn folder_record(&self, id: Uuid) -> Option<Folder> {
        self.services
            .stores
            .folders
            .find_by_id(id)
            .await
            .expect("find folder")
    }

    /// Current link record
    pub async fn link_record(&self, id: Uuid) -> ShareLink {
        self.services
            .stores
            .share_links
            .find_by_id(id)
            .await
            .expect("find link")
            .expect("link exists")
    }
}

/// Build an upload request
pub fn upload_request(folder_id: Option<Uuid>, name: &str, body: &str) -> UploadRequest {
    UploadRequest {
        folder_id,
        name: name.to_string(),
        content_type: Some("text/plain".to_string()),
        description: None,
        is_public: false,
        data: Bytes::from(body.to_string()),
    }
}

/// Drain a streamed download
pub async fn read_all(grant: DownloadGrant) -> Vec<u8> {
    match grant {
        DownloadGrant::Stream { mut stream, .. } => {
            let mut out = Vec::new();
            while let Some(chunk) = stream.next().await {
                out.extend_from_slice(&chunk.expect("chunk"));
            }
            out
        }
        DownloadGrant::Redirect { .. } => panic!("memory store never signs URLs"),
    }
}
