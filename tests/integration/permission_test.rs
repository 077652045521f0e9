//! Collaborator grants and their effect on access.

use chrono::{Duration, Utc};
use uuid::Uuid;

use filehub_core::ErrorKind;
use filehub_entity::permission::{CollaboratorRole, ResourceRef};
use filehub_service::RequestContext;
use filehub_service::file::UpdateFileRequest;
use filehub_service::permission::AddCollaboratorRequest;

use crate::helpers::TestApp;

fn grant(resource: ResourceRef, user_id: Uuid, role: CollaboratorRole) -> AddCollaboratorRequest {
    AddCollaboratorRequest {
        resource,
        user_id,
        role,
        expires_at: None,
    }
}

#[tokio::test]
async fn test_viewer_can_read_but_not_edit() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let viewer_id = Uuid::new_v4();
    let file = app.upload(&owner, None, "plan.txt").await;

    let stranger = RequestContext::user(viewer_id);
    let err = app.services.files.get_file(&stranger, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));

    app.services
        .collaborators
        .add_collaborator(&owner, grant(ResourceRef::File(file.id), viewer_id, CollaboratorRole::Viewer))
        .await
        .unwrap();

    let viewer = RequestContext::user(viewer_id);
    app.services.files.get_file(&viewer, file.id).await.unwrap();
    let err = app
        .services
        .files
        .update_file(
            &viewer,
            file.id,
            UpdateFileRequest {
                is_starred: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_folder_grant_reaches_nested_files() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let editor_id = Uuid::new_v4();
    let team = app.folder(&owner, None, "team").await;
    let deep = app.folder(&owner, Some(team.id), "deep").await;
    let file = app.upload(&owner, Some(deep.id), "spec.txt").await;

    app.services
        .collaborators
        .add_collaborator(&owner, grant(ResourceRef::Folder(team.id), editor_id, CollaboratorRole::Editor))
        .await
        .unwrap();

    let editor = RequestContext::user(editor_id);
    let renamed = app
        .services
        .files
        .update_file(
            &editor,
            file.id,
            UpdateFileRequest {
                name: Some("spec-v2.txt".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "spec-v2.txt");

    // New folders made by the editor belong to the tree's owner.
    let sub = app.folder(&editor, Some(deep.id), "by-editor").await;
    assert_eq!(Some(sub.owner_id), owner.user_id());

    // Trash stays owner-only.
    let err = app.services.trash.trash_file(&editor, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
}

#[tokio::test]
async fn test_expired_grant_gives_nothing_and_is_swept() {
    let app = TestApp::new();
    let owner = RequestContext::user(Uuid::new_v4());
    let user_id = Uuid::new_v4();
    let file = app.upload(&owner, None, "temp.txt").await;

    let collab = app
        .services
        .collaborators
        .add_collaborator(
            &owner,
            AddCollaboratorRequest {
                expires_at: Some(Utc::now() + Duration::hours(1)),
                ..grant(ResourceRef::File(file.id), user_id, CollaboratorRole::Editor)
            },
        )
        .await
        .unwrap();

    let user = RequestContext::user(user_id);
    app.services.files.get_file(&user, file.id).await.unwrap();
    assert_eq!(app.services.collaborators.shared_with_me(&user).await.unwrap().len(), 1);

    app.services
        .stores
        .collaborators
        .update(collab.id, CollaboratorRole::Editor, Some(Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    let err = app.services.files.get_file(&user, file.id).await.unwrap_err();
    assert!(err.is(ErrorKind::Forbidden));
    assert!(app.services.collaborators.shared_with_me(&user).await.unwrap().is_empty());

    let removed = app.services.collaborators.sweep_expired(Utc::now()).await.unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn test_grant_rules() {
    let app = TestApp::new();
    let owner_id = Uuid::new_v4();
    let owner = RequestContext::user(owner_id);
    let file = app.upload(&owner, None, "rules.txt").await;
    let resource = ResourceRef::File(file.id);

    let err = app
        .services
        .collaborators
        .add_collaborator(&owner, grant(resource, owner_id, CollaboratorRole::Viewer))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Validation));

    let other = Uuid::new_v4();
    let first = app
        .services
        .collaborators
        .add_collaborator(&owner, grant(resource, other, CollaboratorRole::Viewer))
        .await
        .unwrap();
    let second = app
        .services
        .collaborators
        .add_collaborator(&owner, grant(resource, other, CollaboratorRole::Commenter))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.role, CollaboratorRole::Commenter);

    let listed = app
        .services
        .collaborators
        .list_collaborators(&owner, resource)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // The grantee may drop their own grant.
    app.services
        .collaborators
        .remove_collaborator(&RequestContext::user(other), second.id)
        .await
        .unwrap();
    assert!(
        app.services
            .collaborators
            .list_collaborators(&owner, resource)
            .await
            .unwrap()
            .is_empty()
    );
}
