//! Folder tree: materialized paths, moves and collisions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use filehub_core::ErrorKind;
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_database::MemoryDatabase;
use filehub_database::store::FolderStore;
use filehub_entity::folder::{CreateFolder, Folder};
use filehub_service::folder::{CreateFolderRequest, MoveFolderRequest};
use filehub_service::{RequestContext, Stores};

use crate::helpers::TestApp;

/// Folder store whose sibling lookup stalls, so two moves interleave
/// between their checks and their writes.
#[derive(Debug)]
struct StallingFolders(MemoryDatabase);

#[async_trait]
impl FolderStore for StallingFolders {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        FolderStore::find_by_id(&self.0, id).await
    }

    async fn list_children(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Folder>> {
        self.0.list_children(owner_id, parent_id, page).await
    }

    async fn find_active_sibling(
        &self,
        owner_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> AppResult<Option<Folder>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.0.find_active_sibling(owner_id, parent_id, name).await
    }

    async fn find_ancestors(&self, id: Uuid) -> AppResult<Vec<Folder>> {
        self.0.find_ancestors(id).await
    }

    async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        FolderStore::create(&self.0, data).await
    }

    async fn relocate(&self, id: Uuid, parent_id: Option<Uuid>, name: &str) -> AppResult<Folder> {
        self.0.relocate(id, parent_id, name).await
    }

    async fn set_color(&self, id: Uuid, color: Option<&str>) -> AppResult<Folder> {
        self.0.set_color(id, color).await
    }
}

#[tokio::test]
async fn test_paths_follow_rename_and_move() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let docs = app.folder(&owner, None, "docs").await;
    let reports = app.folder(&owner, Some(docs.id), "reports").await;
    let q1 = app.folder(&owner, Some(reports.id), "q1").await;
    let archive = app.folder(&owner, None, "archive").await;
    assert_eq!(q1.path, "/docs/reports/q1");

    app.services
        .folders
        .rename_folder(&owner, reports.id, "summaries")
        .await
        .unwrap();
    assert_eq!(app.folder_record(q1.id).await.unwrap().path, "/docs/summaries/q1");

    let moved = app
        .services
        .folders
        .move_folder(
            &owner,
            reports.id,
            MoveFolderRequest {
                new_parent_id: Some(archive.id),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.path, "/archive/summaries");
    assert_eq!(moved.parent_id, Some(archive.id));
    assert_eq!(app.folder_record(q1.id).await.unwrap().path, "/archive/summaries/q1");

    let crumbs = app.services.folders.breadcrumbs(&owner, q1.id).await.unwrap();
    let names: Vec<_> = crumbs.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["archive", "summaries", "q1"]);
}

#[tokio::test]
async fn test_move_into_descendant_conflicts() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let a = app.folder(&owner, None, "a").await;
    let b = app.folder(&owner, Some(a.id), "b").await;
    let c = app.folder(&owner, Some(b.id), "c").await;

    for target in [a.id, c.id] {
        let err = app
            .services
            .folders
            .move_folder(
                &owner,
                a.id,
                MoveFolderRequest {
                    new_parent_id: Some(target),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Conflict));
    }

    assert_eq!(app.folder_record(a.id).await.unwrap().path, "/a");
    assert_eq!(app.folder_record(c.id).await.unwrap().path, "/a/b/c");
}

#[tokio::test]
async fn test_crossed_moves_never_form_a_cycle() {
    let db = MemoryDatabase::new();
    let mut stores = Stores::memory(db.clone());
    stores.folders = Arc::new(StallingFolders(db.clone()));
    let app = TestApp::with_stores(db, stores);
    let owner = RequestContext::user(Uuid::new_v4());
    let a = app.folder(&owner, None, "a").await;
    let b = app.folder(&owner, None, "b").await;

    let into = |id: Uuid| MoveFolderRequest {
        new_parent_id: Some(id),
    };
    let (a_under_b, b_under_a) = tokio::join!(
        app.services.folders.move_folder(&owner, a.id, into(b.id)),
        app.services.folders.move_folder(&owner, b.id, into(a.id)),
    );

    let outcomes = [&a_under_b, &b_under_a];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let err = outcomes
        .iter()
        .find_map(|r| r.as_ref().err())
        .unwrap();
    assert!(err.is(ErrorKind::Conflict));

    for id in [a.id, b.id] {
        let chain = app.services.folders.breadcrumbs(&owner, id).await.unwrap();
        assert_eq!(chain.first().unwrap().parent_id, None);
        let folder = chain.last().unwrap();
        let expected: Vec<_> = chain.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folder.path, format!("/{}", expected.join("/")));
    }
}

#[tokio::test]
async fn test_sibling_names_collide() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let first = app.folder(&owner, None, "music").await;
    let other = app.folder(&owner, None, "video").await;

    let req = CreateFolderRequest {
        parent_id: None,
        name: "music".into(),
        color: None,
    };
    let err = app.services.folders.create_folder(&owner, req).await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    let err = app
        .services
        .folders
        .rename_folder(&owner, other.id, "music")
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    // A trashed folder frees its name.
    app.services.trash.trash_folder(&owner, first.id).await.unwrap();
    app.services
        .folders
        .rename_folder(&owner, other.id, "music")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_cannot_create_inside_trashed_folder() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let bin = app.folder(&owner, None, "old").await;
    app.services.trash.trash_folder(&owner, bin.id).await.unwrap();

    let err = app
        .services
        .folders
        .create_folder(
            &owner,
            CreateFolderRequest {
                parent_id: Some(bin.id),
                name: "new".into(),
                color: None,
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
}

#[tokio::test]
async fn test_color_validation() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let folder = app.folder(&owner, None, "tagged").await;

    let updated = app
        .services
        .folders
        .set_color(&owner, folder.id, Some("#a1b2c3"))
        .await
        .unwrap();
    assert_eq!(updated.color.as_deref(), Some("#a1b2c3"));

    let err = app
        .services
        .folders
        .set_color(&owner, folder.id, Some("red"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));
}
