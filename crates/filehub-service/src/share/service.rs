//! Share link management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use filehub_auth::password::PasswordHasher;
use filehub_auth::token::generate_share_token;
use filehub_core::config::SharingConfig;
use filehub_core::error::{AppError, ErrorKind};
use filehub_core::events::{DomainEvent, EventPayload, ShareEvent};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::{PageRequest, PageResponse};
use filehub_entity::permission::{CollaboratorRole, ResourceRef};
use filehub_entity::share::{CreateShareLink, ShareLink, SharePermission, UpdateShareLink};

use crate::context::RequestContext;
use crate::permission::PermissionService;
use crate::stores::Stores;

/// Request to create a share link.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateShareLinkRequest {
    /// File or folder to share.
    pub resource: ResourceRef,
    /// Optional password.
    #[validate(length(min = 4, max = 50))]
    pub password: Option<String>,
    /// Permission level.
    pub permission: SharePermission,
    /// Allow byte downloads.
    pub allow_download: bool,
    /// Free-text description.
    #[validate(length(max = 500))]
    pub description: Option<String>,
    /// Expiry (None = never).
    pub expires_at: Option<DateTime<Utc>>,
    /// Download quota (0 = unlimited).
    #[validate(range(min = 0))]
    pub max_downloads: i32,
}

/// Changes to a share link. `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateShareLinkRequest {
    /// Set or clear the password.
    #[validate(length(min = 4, max = 50))]
    pub password: Option<Option<String>>,
    /// New permission.
    pub permission: Option<SharePermission>,
    /// New allow-download flag.
    pub allow_download: Option<bool>,
    /// Set or clear the description.
    #[validate(length(max = 500))]
    pub description: Option<Option<String>>,
    /// Set or clear the expiry.
    pub expires_at: Option<Option<DateTime<Utc>>>,
    /// New quota.
    #[validate(range(min = 0))]
    pub max_downloads: Option<i32>,
    /// Enable or disable the link.
    pub is_active: Option<bool>,
}

fn validation_error(err: validator::ValidationErrors) -> AppError {
    AppError::validation(format!("Invalid share link request: {err}"))
}

fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> AppResult<()> {
    if expires_at.is_some_and(|exp| exp <= now) {
        return Err(AppError::validation("Expiry must be in the future"));
    }
    Ok(())
}

/// Creates and manages share links on behalf of their creators.
#[derive(Debug, Clone)]
pub struct ShareService {
    stores: Stores,
    permissions: PermissionService,
    hasher: Arc<PasswordHasher>,
    config: SharingConfig,
}

impl ShareService {
    /// Creates a new share service.
    pub fn new(
        stores: Stores,
        permissions: PermissionService,
        hasher: Arc<PasswordHasher>,
        config: SharingConfig,
    ) -> Self {
        Self {
            stores,
            permissions,
            hasher,
            config,
        }
    }

    async fn hash(&self, password: String) -> AppResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
    }

    /// Owners may always share; editors only when the deployment allows it.
    async fn require_share_right(&self, ctx: &RequestContext, resource: ResourceRef) -> AppResult<()> {
        let level = match resource {
            ResourceRef::File(id) => {
                self.permissions
                    .load_file(ctx, id, CollaboratorRole::Editor)
                    .await?
                    .1
            }
            ResourceRef::Folder(id) => {
                self.permissions
                    .load_folder(ctx, id, CollaboratorRole::Editor)
                    .await?
                    .1
            }
        };
        if level.is_owner() || self.config.allow_editor_links {
            Ok(())
        } else {
            Err(AppError::forbidden("Only the owner can share this resource"))
        }
    }

    /// Create a link with a fresh token.
    pub async fn create_link(
        &self,
        ctx: &RequestContext,
        req: CreateShareLinkRequest,
    ) -> AppResult<ShareLink> {
        let user_id = ctx.require_user()?;
        req.validate().map_err(validation_error)?;
        check_expiry(req.expires_at, Utc::now())?;
        self.require_share_right(ctx, req.resource).await?;

        let password_hash = match req.password {
            Some(password) => Some(self.hash(password).await?),
            None => None,
        };
        let mut data = CreateShareLink {
            created_by: user_id,
            resource: req.resource,
            token: String::new(),
            password_hash,
            permission: req.permission,
            allow_download: req.allow_download,
            description: req.description,
            expires_at: req.expires_at,
            max_downloads: req.max_downloads,
        };

        let attempts = self.config.token_attempts.max(1);
        let mut attempt = 0;
        let link = loop {
            attempt += 1;
            data.token = generate_share_token();
            match self.stores.share_links.create(&data).await {
                Ok(link) => break link,
                Err(e) if e.is(ErrorKind::Conflict) && attempt < attempts => {
                    warn!(attempt, "Share token collision, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            user_id = %user_id,
            share_id = %link.id,
            resource = ?link.resource()?,
            "Share link created"
        );
        DomainEvent::new(
            Some(user_id),
            EventPayload::Share(ShareEvent::Created {
                share_id: link.id,
                resource_type: req.resource.resource_type().to_string(),
                resource_id: req.resource.id(),
            }),
        )
        .emit();
        Ok(link)
    }

    /// Links created by the caller, newest first.
    pub async fn list_links(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> AppResult<PageResponse<ShareLink>> {
        let user_id = ctx.require_user()?;
        self.stores.share_links.list_by_creator(user_id, &page).await
    }

    /// A link the caller created.
    pub async fn get_link(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<ShareLink> {
        let user_id = ctx.require_user()?;
        let link = self
            .stores
            .share_links
            .find_by_id(share_id)
            .await?
            .ok_or_else(|| AppError::not_found("Share link not found"))?;
        if link.created_by != user_id {
            return Err(AppError::forbidden("You can only manage your own share links"));
        }
        Ok(link)
    }

    /// Apply changes to a link the caller created.
    pub async fn update_link(
        &self,
        ctx: &RequestContext,
        share_id: Uuid,
        req: UpdateShareLinkRequest,
    ) -> AppResult<ShareLink> {
        req.validate().map_err(validation_error)?;
        let link = self.get_link(ctx, share_id).await?;

        if let Some(expires_at) = req.expires_at {
            check_expiry(expires_at, Utc::now())?;
        }
        let password_hash = match req.password {
            Some(Some(password)) => Some(Some(self.hash(password).await?)),
            Some(None) => Some(None),
            None => None,
        };

        let updated = self
            .stores
            .share_links
            .update(
                link.id,
                &UpdateShareLink {
                    password_hash,
                    permission: req.permission,
                    allow_download: req.allow_download,
                    description: req.description,
                    expires_at: req.expires_at,
                    max_downloads: req.max_downloads,
                    is_active: req.is_active,
                },
            )
            .await?;

        info!(user_id = ?ctx.user_id(), share_id = %share_id, "Share link updated");
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::Updated { share_id }),
        )
        .emit();
        Ok(updated)
    }

    /// Deactivate a link. The record and its counters are kept.
    pub async fn revoke_link(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<ShareLink> {
        let link = self.get_link(ctx, share_id).await?;
        let revoked = self
            .stores
            .share_links
            .update(
                link.id,
                &UpdateShareLink {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        info!(user_id = ?ctx.user_id(), share_id = %share_id, "Share link revoked");
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::Revoked { share_id }),
        )
        .emit();
        Ok(revoked)
    }

    /// Delete a link permanently.
    pub async fn delete_link(&self, ctx: &RequestContext, share_id: Uuid) -> AppResult<()> {
        let link = self.get_link(ctx, share_id).await?;
        if !self.stores.share_links.delete(link.id).await? {
            return Err(AppError::not_found("Share link not found"));
        }

        info!(user_id = ?ctx.user_id(), share_id = %share_id, "Share link deleted");
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::Deleted { share_id }),
        )
        .emit();
        Ok(())
    }
}
