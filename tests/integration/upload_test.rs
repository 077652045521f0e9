//! Uploads: single, batch, deadlines and visibility.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use filehub_core::ErrorKind;
use filehub_core::error::AppError;
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_database::MemoryDatabase;
use filehub_database::store::FileStore;
use filehub_entity::file::{CreateFile, File, UpdateFile};
use filehub_service::file::UpdateFileRequest;
use filehub_service::{RequestContext, Stores};
use filehub_storage::MemoryObjectStore;

use crate::helpers::{TestApp, read_all, upload_request};

/// File store that refuses every insert.
#[derive(Debug)]
struct RejectingFiles(MemoryDatabase);

#[async_trait]
impl FileStore for RejectingFiles {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<File>> {
        FileStore::find_by_id(&self.0, id).await
    }

    async fn list_in_folder(
        &self,
        owner_id: Uuid,
        folder_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<File>> {
        self.0.list_in_folder(owner_id, folder_id, page).await
    }

    async fn create(&self, _data: &CreateFile) -> AppResult<File> {
        Err(AppError::database("connection reset during insert"))
    }

    async fn update(&self, id: Uuid, data: &UpdateFile) -> AppResult<File> {
        FileStore::update(&self.0, id, data).await
    }

    async fn move_to(&self, id: Uuid, folder_id: Option<Uuid>) -> AppResult<File> {
        self.0.move_to(id, folder_id).await
    }
}

#[tokio::test]
async fn test_upload_stores_bytes_and_metadata() {
    let app = TestApp::new();
    let owner_id = Uuid::new_v4();
    let owner = RequestContext::user(owner_id);
    let folder = app.folder(&owner, None, "inbox").await;

    let file = app
        .services
        .uploads
        .upload(&owner, upload_request(Some(folder.id), "Notes.TXT", "body"))
        .await
        .unwrap();
    assert_eq!(file.owner_id, owner_id);
    assert_eq!(file.size_bytes, 4);
    assert_eq!(file.extension.as_deref(), Some("txt"));
    assert!(file.storage_key.starts_with(&owner_id.to_string()));
    assert!(!file.storage_key.contains("Notes"));

    let grant = app.services.downloads.download(&owner, file.id).await.unwrap();
    assert_eq!(read_all(grant).await, b"body");

    let listed = app
        .services
        .files
        .list_files(&owner, Some(folder.id), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total_items, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_upload_leaves_nothing_behind() {
    let objects = MemoryObjectStore::new().with_put_latency(Duration::from_secs(10));
    let app = TestApp::with_objects(objects);
    let owner = RequestContext::user(Uuid::new_v4()).with_timeout(Duration::from_secs(1));

    let err = app
        .services
        .uploads
        .upload(&owner, upload_request(None, "slow.bin", "data"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Storage));

    let listed = app
        .services
        .files
        .list_files(&owner, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total_items, 0);
    assert!(app.objects.is_empty().await);
}

#[tokio::test]
async fn test_failed_metadata_insert_deletes_object() {
    let db = MemoryDatabase::new();
    let mut stores = Stores::memory(db.clone());
    stores.files = Arc::new(RejectingFiles(db.clone()));
    let app = TestApp::with_stores(db, stores);
    let owner = RequestContext::user(Uuid::new_v4());

    let err = app
        .services
        .uploads
        .upload(&owner, upload_request(None, "report.pdf", "%PDF"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Database));
    assert!(app.objects.is_empty().await);

    let listed = app
        .services
        .files
        .list_files(&owner, None, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.total_items, 0);
}

#[tokio::test]
async fn test_batch_failure_does_not_abort_siblings() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());

    let mut requests: Vec<_> = (0..4)
        .map(|i| upload_request(None, &format!("file-{i}.txt"), "x"))
        .collect();
    requests.push(upload_request(None, "bad/name.txt", "x"));

    let report = app
        .services
        .uploads
        .upload_batch(&owner, requests)
        .await
        .unwrap();
    assert_eq!(report.uploaded.len(), 4);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad/name.txt");
    assert!(report.failed[0].1.is(ErrorKind::Validation));
    assert_eq!(app.objects.len().await, 4);
}

#[tokio::test]
async fn test_public_toggle_updates_object_visibility() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "poster.png").await;
    assert_eq!(
        app.objects.describe(&file.storage_key).await.map(|(_, public)| public),
        Some(false)
    );

    let updated = app
        .services
        .files
        .update_file(
            &owner,
            file.id,
            UpdateFileRequest {
                is_public: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.is_public);
    assert_eq!(
        app.objects.describe(&file.storage_key).await.map(|(_, public)| public),
        Some(true)
    );

    // Anyone may now read it.
    let grant = app
        .services
        .downloads
        .download(&RequestContext::anonymous(), file.id)
        .await
        .unwrap();
    assert_eq!(read_all(grant).await, b"hello");
}

#[tokio::test]
async fn test_move_file_into_trashed_folder_conflicts() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "loose.txt").await;
    let target = app.folder(&owner, None, "target").await;
    let binned = app.folder(&owner, None, "binned").await;
    app.services.trash.trash_folder(&owner, binned.id).await.unwrap();

    let err = app
        .services
        .files
        .move_file(&owner, file.id, Some(binned.id))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let moved = app
        .services
        .files
        .move_file(&owner, file.id, Some(target.id))
        .await
        .unwrap();
    assert_eq!(moved.folder_id, Some(target.id));
}
