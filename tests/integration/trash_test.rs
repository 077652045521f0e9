//! Trash lifecycle: subtree trash, exact restore, purge.

use uuid::Uuid;

use filehub_core::ErrorKind;
use filehub_core::traits::storage::ObjectStore;
use filehub_entity::permission::ResourceRef;
use filehub_service::RequestContext;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_subtree_trash_shares_one_timestamp() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let root = app.folder(&owner, None, "projects").await;
    let child = app.folder(&owner, Some(root.id), "alpha").await;
    let grandchild = app.folder(&owner, Some(child.id), "drafts").await;
    let f1 = app.upload(&owner, Some(root.id), "readme.txt").await;
    let f2 = app.upload(&owner, Some(grandchild.id), "draft.txt").await;

    let change = app.services.trash.trash_folder(&owner, root.id).await.unwrap();
    assert_eq!(change.folders, 3);
    assert_eq!(change.files, 2);

    let stamp = app.folder_record(root.id).await.unwrap().trashed_at;
    assert!(stamp.is_some());
    for id in [child.id, grandchild.id] {
        let folder = app.folder_record(id).await.unwrap();
        assert!(folder.is_trashed);
        assert_eq!(folder.trashed_at, stamp);
    }
    for id in [f1.id, f2.id] {
        let file = app.file_record(id).await.unwrap();
        assert!(file.is_trashed);
        assert_eq!(file.trashed_at, stamp);
    }

    // Trashing again is a no-op.
    let again = app.services.trash.trash_folder(&owner, root.id).await.unwrap();
    assert_eq!(again.total(), 0);
}

#[tokio::test]
async fn test_restore_is_exact_reversal() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let root = app.folder(&owner, None, "photos").await;
    let kept = app.upload(&owner, Some(root.id), "kept.jpg").await;
    let earlier = app.upload(&owner, Some(root.id), "earlier.jpg").await;

    app.services.trash.trash_file(&owner, earlier.id).await.unwrap();
    let earlier_stamp = app.file_record(earlier.id).await.unwrap().trashed_at;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    app.services.trash.trash_folder(&owner, root.id).await.unwrap();
    let change = app.services.trash.restore_folder(&owner, root.id).await.unwrap();
    assert_eq!(change.folders, 1);
    assert_eq!(change.files, 1);

    assert!(!app.file_record(kept.id).await.unwrap().is_trashed);
    let still = app.file_record(earlier.id).await.unwrap();
    assert!(still.is_trashed);
    assert_eq!(still.trashed_at, earlier_stamp);
}

#[tokio::test]
async fn test_restore_under_trashed_parent_conflicts() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let parent = app.folder(&owner, None, "parent").await;
    let file = app.upload(&owner, Some(parent.id), "note.txt").await;

    app.services.trash.trash_file(&owner, file.id).await.unwrap();
    app.services.trash.trash_folder(&owner, parent.id).await.unwrap();

    let err = app.services.trash.restore_file(&owner, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
}

#[tokio::test]
async fn test_upload_trash_restore_purge_scenario() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "cycle.txt").await;
    assert!(app.objects.exists(&file.storage_key).await.unwrap());

    app.services.trash.trash_file(&owner, file.id).await.unwrap();
    let listing = app
        .services
        .trash
        .list_trash(&owner, Default::default())
        .await
        .unwrap();
    assert_eq!(listing.files.items.len(), 1);
    assert_eq!(listing.files.items[0].id, file.id);

    let err = app.services.files.get_file(&owner, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    app.services.trash.restore_file(&owner, file.id).await.unwrap();
    app.services.files.get_file(&owner, file.id).await.unwrap();

    app.services.trash.trash_file(&owner, file.id).await.unwrap();
    let report = app.services.trash.purge_file(&owner, file.id).await.unwrap();
    assert_eq!(report.files, 1);
    assert_eq!(report.objects_deleted, 1);
    assert_eq!(report.orphaned_objects, 0);

    let err = app.services.files.get_file(&owner, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.file_record(file.id).await.is_none());
    assert!(!app.objects.exists(&file.storage_key).await.unwrap());
}

#[tokio::test]
async fn test_restore_onto_live_sibling_name_conflicts() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let old_docs = app.folder(&owner, None, "docs").await;
    let nested = app.folder(&owner, Some(old_docs.id), "drafts").await;
    let file = app.upload(&owner, Some(nested.id), "plan.md").await;

    app.services.trash.trash_folder(&owner, old_docs.id).await.unwrap();
    let stamp = app.folder_record(old_docs.id).await.unwrap().trashed_at;
    let new_docs = app.folder(&owner, None, "docs").await;

    let err = app
        .services
        .trash
        .restore_folder(&owner, old_docs.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));

    for id in [old_docs.id, nested.id] {
        let folder = app.folder_record(id).await.unwrap();
        assert!(folder.is_trashed);
        assert_eq!(folder.trashed_at, stamp);
    }
    let old_docs = app.folder_record(old_docs.id).await.unwrap();
    assert_eq!(old_docs.name, "docs");
    assert_eq!(old_docs.path, "/docs");
    let file = app.file_record(file.id).await.unwrap();
    assert!(file.is_trashed);
    assert_eq!(file.trashed_at, stamp);
    assert!(!app.folder_record(new_docs.id).await.unwrap().is_trashed);
}

#[tokio::test]
async fn test_purge_requires_trashed_item() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "live.txt").await;

    let err = app.services.trash.purge_file(&owner, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.file_record(file.id).await.is_some());
}

#[tokio::test]
async fn test_purge_folder_removes_links_and_objects() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let root = app.folder(&owner, None, "archive").await;
    let sub = app.folder(&owner, Some(root.id), "2023").await;
    let file = app.upload(&owner, Some(sub.id), "q4.csv").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 0, None).await;

    app.services.trash.trash_folder(&owner, root.id).await.unwrap();
    let report = app.services.trash.purge_folder(&owner, root.id).await.unwrap();
    assert_eq!(report.folders, 2);
    assert_eq!(report.files, 1);

    assert!(app.folder_record(sub.id).await.is_none());
    assert!(app.objects.is_empty().await);
    let gone = app
        .services
        .stores
        .share_links
        .find_by_id(link.id)
        .await
        .unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn test_empty_trash_and_ownership() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let a = app.upload(&owner, None, "a.txt").await;
    let b = app.upload(&owner, None, "b.txt").await;

    let stranger = RequestContext::user(Uuid::new_v4());
    let err = app.services.trash.trash_file(&stranger, a.id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    app.services.trash.trash_file(&owner, a.id).await.unwrap();
    app.services.trash.trash_file(&owner, b.id).await.unwrap();
    let report = app.services.trash.empty_trash(&owner).await.unwrap();
    assert_eq!(report.files, 2);
    assert!(app.objects.is_empty().await);
}
