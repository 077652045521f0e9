//! Collaborator grant management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventPayload, ShareEvent};
use filehub_core::result::AppResult;
use filehub_entity::permission::{Collaborator, CollaboratorRole, ResourceRef, UpsertCollaborator};

use super::PermissionService;
use crate::context::RequestContext;
use crate::stores::Stores;

/// Request to grant a user a role on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCollaboratorRequest {
    /// Resource to grant on.
    pub resource: ResourceRef,
    /// Grantee.
    pub user_id: Uuid,
    /// Role granted.
    pub role: CollaboratorRole,
    /// When the grant lapses (None = never).
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request to change an existing grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCollaboratorRequest {
    /// New role.
    pub role: CollaboratorRole,
    /// New expiry (None = never).
    pub expires_at: Option<DateTime<Utc>>,
}

/// Adds, lists, changes and removes collaborator grants.
#[derive(Debug, Clone)]
pub struct CollaboratorService {
    stores: Stores,
    permissions: PermissionService,
}

impl CollaboratorService {
    /// Creates a new collaborator service.
    pub fn new(stores: Stores, permissions: PermissionService) -> Self {
        Self { stores, permissions }
    }

    /// Owner of a live resource.
    async fn live_owner(&self, resource: ResourceRef) -> AppResult<Uuid> {
        let owner = match resource {
            ResourceRef::File(id) => self
                .stores
                .files
                .find_by_id(id)
                .await?
                .filter(|f| !f.is_trashed)
                .map(|f| f.owner_id),
            ResourceRef::Folder(id) => self
                .stores
                .folders
                .find_by_id(id)
                .await?
                .filter(|f| !f.is_trashed)
                .map(|f| f.owner_id),
        };
        owner.ok_or_else(|| {
            AppError::not_found(format!("{} {} not found", resource.resource_type(), resource.id()))
        })
    }

    async fn require_owner(&self, ctx: &RequestContext, resource: ResourceRef) -> AppResult<Uuid> {
        let user_id = ctx.require_user()?;
        let owner_id = self.live_owner(resource).await?;
        if owner_id != user_id {
            return Err(AppError::forbidden(
                "Only the owner can manage collaborators",
            ));
        }
        Ok(user_id)
    }

    fn validate_expiry(expires_at: Option<DateTime<Utc>>) -> AppResult<()> {
        match expires_at {
            Some(at) if at <= Utc::now() => {
                Err(AppError::validation("Grant expiry must be in the future"))
            }
            _ => Ok(()),
        }
    }

    /// Grant `role` to a user, replacing any grant they already hold on the
    /// resource.
    pub async fn add_collaborator(
        &self,
        ctx: &RequestContext,
        req: AddCollaboratorRequest,
    ) -> AppResult<Collaborator> {
        let owner_id = self.require_owner(ctx, req.resource).await?;
        if req.user_id == owner_id {
            return Err(AppError::validation(
                "The owner cannot be added as a collaborator",
            ));
        }
        Self::validate_expiry(req.expires_at)?;

        let grant = self
            .stores
            .collaborators
            .upsert(&UpsertCollaborator {
                resource: req.resource,
                user_id: req.user_id,
                role: req.role,
                expires_at: req.expires_at,
                granted_by: owner_id,
            })
            .await?;

        info!(
            owner_id = %owner_id,
            user_id = %req.user_id,
            resource = ?req.resource,
            role = %req.role,
            "Collaborator granted"
        );
        DomainEvent::new(
            Some(owner_id),
            EventPayload::Share(ShareEvent::CollaboratorGranted {
                collaborator_id: grant.id,
                user_id: grant.user_id,
                role: grant.role.to_string(),
            }),
        )
        .emit();
        Ok(grant)
    }

    /// Grants on a resource. Anyone with view access may list them.
    pub async fn list_collaborators(
        &self,
        ctx: &RequestContext,
        resource: ResourceRef,
    ) -> AppResult<Vec<Collaborator>> {
        match resource {
            ResourceRef::File(id) => {
                self.permissions
                    .load_file(ctx, id, CollaboratorRole::Viewer)
                    .await?;
            }
            ResourceRef::Folder(id) => {
                self.permissions
                    .load_folder(ctx, id, CollaboratorRole::Viewer)
                    .await?;
            }
        }
        self.stores.collaborators.list_for_resource(resource).await
    }

    async fn load_grant(&self, id: Uuid) -> AppResult<Collaborator> {
        self.stores
            .collaborators
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Collaborator {id} not found")))
    }

    /// Change role and expiry. Owner only.
    pub async fn update_collaborator(
        &self,
        ctx: &RequestContext,
        collaborator_id: Uuid,
        req: UpdateCollaboratorRequest,
    ) -> AppResult<Collaborator> {
        let grant = self.load_grant(collaborator_id).await?;
        self.require_owner(ctx, grant.resource()?).await?;
        Self::validate_expiry(req.expires_at)?;
        self.stores
            .collaborators
            .update(collaborator_id, req.role, req.expires_at)
            .await
    }

    /// Remove a grant. The owner may remove anyone; a grantee may remove
    /// their own grant.
    pub async fn remove_collaborator(&self, ctx: &RequestContext, collaborator_id: Uuid) -> AppResult<()> {
        let user_id = ctx.require_user()?;
        let grant = self.load_grant(collaborator_id).await?;
        if grant.user_id != user_id {
            self.require_owner(ctx, grant.resource()?).await?;
        }
        self.stores.collaborators.delete(collaborator_id).await?;

        DomainEvent::new(
            Some(user_id),
            EventPayload::Share(ShareEvent::CollaboratorRemoved { collaborator_id }),
        )
        .emit();
        Ok(())
    }

    /// Unexpired grants held by the caller.
    pub async fn shared_with_me(&self, ctx: &RequestContext) -> AppResult<Vec<Collaborator>> {
        let user_id = ctx.require_user()?;
        let now = Utc::now();
        Ok(self
            .stores
            .collaborators
            .list_for_user(user_id)
            .await?
            .into_iter()
            .filter(|g| !g.is_expired(now))
            .collect())
    }

    /// Delete grants expired at `now`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.stores.collaborators.delete_expired(now).await?;
        if removed > 0 {
            info!(removed, "Expired collaborator grants removed");
        }
        Ok(removed)
    }
}
