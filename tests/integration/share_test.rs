//! Share link access: quota, password, expiry and revocation.

use chrono::{Duration, Utc};
use uuid::Uuid;

use filehub_core::ErrorKind;
use filehub_core::config::SharingConfig;
use filehub_core::traits::storage::ObjectStore;
use filehub_entity::permission::{CollaboratorRole, ResourceRef};
use filehub_entity::share::UpdateShareLink;
use filehub_service::permission::AddCollaboratorRequest;
use filehub_service::RequestContext;

use crate::helpers::{TestApp, read_all};

#[tokio::test]
async fn test_quota_allows_exactly_k_downloads() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "report.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 2, None).await;

    let visitor = RequestContext::anonymous();
    for _ in 0..2 {
        let grant = app
            .services
            .share_access
            .issue_download(&visitor, &link.token, None, None)
            .await
            .unwrap();
        assert_eq!(read_all(grant).await, b"hello");
    }

    let err = app
        .services
        .share_access
        .issue_download(&visitor, &link.token, None, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::QuotaExhausted));

    assert_eq!(app.link_record(link.id).await.download_count, 2);
    assert_eq!(app.file_record(file.id).await.unwrap().download_count, 2);
}

#[tokio::test]
async fn test_concurrent_downloads_on_single_use_link() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "once.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 1, None).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let access = app.services.share_access.clone();
        let token = link.token.clone();
        handles.push(tokio::spawn(async move {
            access
                .issue_download(&RequestContext::anonymous(), &token, None, None)
                .await
        }));
    }

    let mut granted = 0;
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(e) if e.is(ErrorKind::QuotaExhausted) => exhausted += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((granted, exhausted), (1, 1));
    assert_eq!(app.link_record(link.id).await.download_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_quota_holds_under_contention() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "busy.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 5, None).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let access = app.services.share_access.clone();
        let token = link.token.clone();
        handles.push(tokio::spawn(async move {
            access
                .issue_download(&RequestContext::anonymous(), &token, None, None)
                .await
                .is_ok()
        }));
    }
    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 5);
    assert_eq!(app.link_record(link.id).await.download_count, 5);
}

#[tokio::test]
async fn test_password_protected_link() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "secret.txt").await;
    let link = app
        .link(&owner, ResourceRef::File(file.id), 0, Some("hunter22"))
        .await;

    let stored = app.link_record(link.id).await;
    let hash = stored.password_hash.expect("hash stored");
    assert_ne!(hash, "hunter22");
    assert!(hash.starts_with("$argon2"));

    let visitor = RequestContext::anonymous();
    let access = &app.services.share_access;

    let missing = access.issue_view(&visitor, &link.token, None).await.unwrap_err();
    assert!(missing.is(ErrorKind::InvalidCredential));

    let wrong = access
        .issue_view(&visitor, &link.token, Some("hunter23"))
        .await
        .unwrap_err();
    assert!(wrong.is(ErrorKind::InvalidCredential));

    let view = access
        .issue_view(&visitor, &link.token, Some("hunter22"))
        .await
        .unwrap();
    assert_eq!(view.name, "secret.txt");
    assert_eq!(app.link_record(link.id).await.view_count, 1);
}

#[tokio::test]
async fn test_expired_folder_link() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let folder = app.folder(&owner, None, "shared").await;
    let link = app.link(&owner, ResourceRef::Folder(folder.id), 0, None).await;

    app.services
        .stores
        .share_links
        .update(
            link.id,
            &UpdateShareLink {
                expires_at: Some(Some(Utc::now() - Duration::minutes(1))),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = app
        .services
        .share_access
        .issue_view(&RequestContext::anonymous(), &link.token, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Expired));
    assert_eq!(app.link_record(link.id).await.view_count, 0);
}

#[tokio::test]
async fn test_revoked_and_unknown_links() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "a.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 0, None).await;
    assert_eq!(link.token.len(), 43);

    app.services.shares.revoke_link(&owner, link.id).await.unwrap();
    let visitor = RequestContext::anonymous();
    let err = app
        .services
        .share_access
        .issue_view(&visitor, &link.token, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    let err = app
        .services
        .share_access
        .issue_view(&visitor, "no-such-token", None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_folder_link_view_and_download() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let shared = app.folder(&owner, None, "shared").await;
    let nested = app.folder(&owner, Some(shared.id), "nested").await;
    let inside = app.upload(&owner, Some(nested.id), "inside.txt").await;
    let top = app.upload(&owner, Some(shared.id), "top.txt").await;
    let outside = app.upload(&owner, None, "outside.txt").await;
    let link = app.link(&owner, ResourceRef::Folder(shared.id), 0, None).await;

    let visitor = RequestContext::anonymous();
    let access = &app.services.share_access;

    let view = access.issue_view(&visitor, &link.token, None).await.unwrap();
    let mut names: Vec<_> = view.entries.iter().map(|e| e.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["nested", "top.txt"]);
    assert_eq!(view.owner.id, shared.owner_id);

    access
        .issue_download(&visitor, &link.token, None, Some(inside.id))
        .await
        .unwrap();
    access
        .issue_download(&visitor, &link.token, None, Some(top.id))
        .await
        .unwrap();

    let err = access
        .issue_download(&visitor, &link.token, None, Some(outside.id))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let err = access
        .issue_download(&visitor, &link.token, None, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    assert_eq!(app.link_record(link.id).await.download_count, 2);
}

#[tokio::test]
async fn test_storage_failure_does_not_consume_quota() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "gone.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 1, None).await;

    app.objects.delete(&file.storage_key).await.unwrap();

    let err = app
        .services
        .share_access
        .issue_download(&RequestContext::anonymous(), &link.token, None, None)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert_eq!(app.link_record(link.id).await.download_count, 0);
}

#[tokio::test]
async fn test_editor_links_follow_setting() {
    let owner_id = Uuid::new_v4();
    let editor_id = Uuid::new_v4();

    for (allow, expect_ok) in [(false, false), (true, true)] {
        let app = TestApp::with_sharing(SharingConfig {
            allow_editor_links: allow,
            ..Default::default()
        });
        let owner = RequestContext::user(owner_id);
        let file = app.upload(&owner, None, "doc.txt").await;
        app.services
            .collaborators
            .add_collaborator(
                &owner,
                AddCollaboratorRequest {
                    resource: ResourceRef::File(file.id),
                    user_id: editor_id,
                    role: CollaboratorRole::Editor,
                    expires_at: None,
                },
            )
            .await
            .unwrap();

        let editor = RequestContext::user(editor_id);
        let result = app
            .services
            .shares
            .create_link(
                &editor,
                filehub_service::share::CreateShareLinkRequest {
                    resource: ResourceRef::File(file.id),
                    password: None,
                    permission: filehub_entity::share::SharePermission::View,
                    allow_download: true,
                    description: None,
                    expires_at: None,
                    max_downloads: 0,
                },
            )
            .await;
        assert_eq!(result.is_ok(), expect_ok, "allow_editor_links = {allow}");
        if !expect_ok {
            assert!(result.unwrap_err().is(ErrorKind::Forbidden));
        }
    }
}

#[tokio::test]
async fn test_only_creator_manages_link() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let file = app.upload(&owner, None, "mine.txt").await;
    let link = app.link(&owner, ResourceRef::File(file.id), 0, None).await;

    let stranger = RequestContext::user(Uuid::new_v4());
    let err = app
        .services
        .shares
        .delete_link(&stranger, link.id)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    app.services.shares.delete_link(&owner, link.id).await.unwrap();
    let page = app
        .services
        .shares
        .list_links(&owner, Default::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
}
