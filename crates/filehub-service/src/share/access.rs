//! Share link access: token resolution, authorization, views and downloads.
//!
//! Every access is evaluated against the current link record; there is no
//! share session. Checks run in a fixed order: active, expiry, quota,
//! password.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use filehub_auth::password::PasswordHasher;
use filehub_core::error::AppError;
use filehub_core::events::{DomainEvent, EventOutcome, EventPayload, ShareEvent};
use filehub_core::result::AppResult;
use filehub_core::types::pagination::PageRequest;
use filehub_entity::file::File;
use filehub_entity::permission::{ResourceRef, ResourceType};
use filehub_entity::share::{OwnerProfile, PublicShareView, ShareLink, SharedEntry};
use filehub_storage::StorageManager;

use crate::context::RequestContext;
use crate::file::download::DownloadGrant;
use crate::stores::Stores;

/// Children listed in a folder link view.
const FOLDER_VIEW_LIMIT: u64 = 100;

/// Why a share access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No link with that token, or the shared item is gone.
    NotFound,
    /// Past `expires_at`.
    Expired,
    /// Deactivated by its creator.
    Inactive,
    /// Download quota used up.
    QuotaExhausted,
    /// A password is needed and none was given.
    PasswordRequired,
    /// The given password is wrong.
    PasswordInvalid,
}

impl DenialReason {
    /// Short machine-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired => "expired",
            Self::Inactive => "inactive",
            Self::QuotaExhausted => "quota_exhausted",
            Self::PasswordRequired => "password_required",
            Self::PasswordInvalid => "password_invalid",
        }
    }

    /// The application error reported to the caller.
    pub fn into_error(self) -> AppError {
        match self {
            Self::NotFound => AppError::not_found("Share link not found"),
            Self::Expired => AppError::expired("Share link has expired"),
            Self::Inactive => AppError::forbidden("Share link has been deactivated"),
            Self::QuotaExhausted => {
                AppError::quota_exhausted("Share link has reached its download limit")
            }
            Self::PasswordRequired => AppError::invalid_credential("Password required"),
            Self::PasswordInvalid => AppError::invalid_credential("Invalid password"),
        }
    }
}

/// Outcome of authorizing a share access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access allowed.
    Granted,
    /// Access refused.
    Denied(DenialReason),
}

/// State-based denial, ignoring the password.
fn state_denial(link: &ShareLink, now: DateTime<Utc>) -> Option<DenialReason> {
    if !link.is_active {
        Some(DenialReason::Inactive)
    } else if link.is_expired(now) {
        Some(DenialReason::Expired)
    } else if link.is_quota_exhausted() {
        Some(DenialReason::QuotaExhausted)
    } else {
        None
    }
}

/// Grants anonymous access to shared files and folders.
#[derive(Debug, Clone)]
pub struct ShareAccessService {
    stores: Stores,
    storage: StorageManager,
    hasher: Arc<PasswordHasher>,
}

impl ShareAccessService {
    /// Creates a new share access service.
    pub fn new(stores: Stores, storage: StorageManager, hasher: Arc<PasswordHasher>) -> Self {
        Self {
            stores,
            storage,
            hasher,
        }
    }

    /// Look a link up by token.
    pub async fn resolve(&self, token: &str) -> AppResult<ShareLink> {
        self.stores
            .share_links
            .find_by_token(token)
            .await?
            .ok_or_else(|| DenialReason::NotFound.into_error())
    }

    /// Decide whether `link` may be used at `now` with the supplied password.
    pub async fn authorize(
        &self,
        link: &ShareLink,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<AccessDecision> {
        if let Some(reason) = state_denial(link, now) {
            return Ok(AccessDecision::Denied(reason));
        }
        let Some(hash) = link.password_hash.clone() else {
            return Ok(AccessDecision::Granted);
        };
        let Some(password) = password.map(str::to_owned) else {
            return Ok(AccessDecision::Denied(DenialReason::PasswordRequired));
        };

        let hasher = self.hasher.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))??;
        Ok(if valid {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied(DenialReason::PasswordInvalid)
        })
    }

    fn deny(&self, ctx: &RequestContext, share_id: Option<Uuid>, reason: DenialReason) -> AppError {
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::AccessDenied {
                share_id,
                ip_address: ctx.ip_address.clone(),
            }),
        )
        .with_outcome(EventOutcome::Denied(reason.as_str().to_string()))
        .emit();
        reason.into_error()
    }

    /// Resolve and authorize in one step, auditing any refusal.
    async fn open(
        &self,
        ctx: &RequestContext,
        token: &str,
        password: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<ShareLink> {
        let Some(link) = self.stores.share_links.find_by_token(token).await? else {
            return Err(self.deny(ctx, None, DenialReason::NotFound));
        };
        match self.authorize(&link, password, now).await? {
            AccessDecision::Granted => Ok(link),
            AccessDecision::Denied(reason) => Err(self.deny(ctx, Some(link.id), reason)),
        }
    }

    /// The file a download through `link` delivers.
    ///
    /// File links deliver their file. Folder links deliver the named file,
    /// which must be live and somewhere below the shared folder.
    async fn target_file(&self, link: &ShareLink, file_id: Option<Uuid>) -> AppResult<File> {
        let missing = || AppError::not_found("Shared file not found");
        match link.resource()? {
            ResourceRef::File(id) => {
                if file_id.is_some_and(|requested| requested != id) {
                    return Err(missing());
                }
                self.stores
                    .files
                    .find_by_id(id)
                    .await?
                    .filter(|f| !f.is_trashed)
                    .ok_or_else(missing)
            }
            ResourceRef::Folder(shared_folder) => {
                let requested = file_id.ok_or_else(|| {
                    AppError::validation("A file must be named when downloading from a folder link")
                })?;
                let file = self
                    .stores
                    .files
                    .find_by_id(requested)
                    .await?
                    .filter(|f| !f.is_trashed)
                    .ok_or_else(missing)?;
                let Some(parent) = file.folder_id else {
                    return Err(missing());
                };
                let inside = self
                    .stores
                    .folders
                    .find_ancestors(parent)
                    .await?
                    .iter()
                    .any(|f| f.id == shared_folder);
                if !inside {
                    return Err(missing());
                }
                Ok(file)
            }
        }
    }

    /// Authorize a download, count it, and hand back how to deliver it.
    ///
    /// The link and file counters are incremented together under the
    /// accessibility guard, so concurrent downloads never exceed the quota.
    /// If the guard rejects the increment the link is re-read and the
    /// precise reason returned.
    pub async fn issue_download(
        &self,
        ctx: &RequestContext,
        token: &str,
        password: Option<&str>,
        file_id: Option<Uuid>,
    ) -> AppResult<DownloadGrant> {
        let now = Utc::now();
        let link = self.open(ctx, token, password, now).await?;
        if !link.allow_download {
            return Err(AppError::forbidden("Downloads are disabled for this share link"));
        }
        let file = self.target_file(&link, file_id).await?;

        // Prepare delivery first so a storage failure does not burn quota.
        let grant = DownloadGrant::prepare(&self.storage, &file, ctx.deadline).await?;

        let Some(counted) = self
            .stores
            .share_links
            .record_download(link.id, file.id, now)
            .await?
        else {
            let current = self.stores.share_links.find_by_id(link.id).await?;
            let reason = current
                .as_ref()
                .and_then(|l| state_denial(l, now))
                .unwrap_or(DenialReason::NotFound);
            debug!(share_id = %link.id, reason = reason.as_str(), "Download lost the counter race");
            return Err(self.deny(ctx, Some(link.id), reason));
        };

        info!(
            share_id = %counted.id,
            file_id = %file.id,
            download_count = counted.download_count,
            "Share download issued"
        );
        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::Downloaded {
                share_id: counted.id,
                file_id: file.id,
                download_count: counted.download_count,
            }),
        )
        .emit();
        Ok(grant)
    }

    /// Authorize a view, count it, and return the public projection.
    pub async fn issue_view(
        &self,
        ctx: &RequestContext,
        token: &str,
        password: Option<&str>,
    ) -> AppResult<PublicShareView> {
        let now = Utc::now();
        let link = self.open(ctx, token, password, now).await?;
        let view = self.project(&link).await?;

        let Some(counted) = self.stores.share_links.record_view(link.id, now).await? else {
            let current = self.stores.share_links.find_by_id(link.id).await?;
            let reason = current
                .as_ref()
                .and_then(|l| state_denial(l, now))
                .unwrap_or(DenialReason::NotFound);
            return Err(self.deny(ctx, Some(link.id), reason));
        };

        DomainEvent::new(
            ctx.user_id(),
            EventPayload::Share(ShareEvent::Viewed {
                share_id: counted.id,
                view_count: counted.view_count,
            }),
        )
        .emit();
        Ok(view)
    }

    async fn project(&self, link: &ShareLink) -> AppResult<PublicShareView> {
        let gone = || AppError::not_found("Shared item not found");
        let (resource_type, name, size_bytes, content_type, owner_id, entries) = match link.resource()? {
            ResourceRef::File(id) => {
                let file = self
                    .stores
                    .files
                    .find_by_id(id)
                    .await?
                    .filter(|f| !f.is_trashed)
                    .ok_or_else(gone)?;
                (
                    ResourceType::File,
                    file.name,
                    Some(file.size_bytes),
                    Some(file.content_type),
                    file.owner_id,
                    Vec::new(),
                )
            }
            ResourceRef::Folder(id) => {
                let folder = self
                    .stores
                    .folders
                    .find_by_id(id)
                    .await?
                    .filter(|f| !f.is_trashed)
                    .ok_or_else(gone)?;
                let entries = self.folder_entries(folder.owner_id, folder.id).await?;
                (
                    ResourceType::Folder,
                    folder.name,
                    None,
                    None,
                    folder.owner_id,
                    entries,
                )
            }
        };

        Ok(PublicShareView {
            share_id: link.id,
            resource_type,
            name,
            size_bytes,
            content_type,
            entries,
            permission: link.permission,
            allow_download: link.allow_download,
            description: link.description.clone(),
            expires_at: link.expires_at,
            remaining_downloads: link.remaining_downloads(),
            owner: OwnerProfile { id: owner_id },
        })
    }

    /// Live direct children of a shared folder, folders first.
    async fn folder_entries(&self, owner_id: Uuid, folder_id: Uuid) -> AppResult<Vec<SharedEntry>> {
        let page = PageRequest::new(1, FOLDER_VIEW_LIMIT);
        let folders = self
            .stores
            .folders
            .list_children(owner_id, Some(folder_id), &page)
            .await?;
        let files = self
            .stores
            .files
            .list_in_folder(owner_id, Some(folder_id), &page)
            .await?;

        let mut entries: Vec<SharedEntry> = folders
            .items
            .into_iter()
            .map(|f| SharedEntry {
                id: f.id,
                name: f.name,
                resource_type: ResourceType::Folder,
                size_bytes: None,
                content_type: None,
            })
            .collect();
        entries.extend(files.items.into_iter().map(|f| SharedEntry {
            id: f.id,
            name: f.name,
            resource_type: ResourceType::File,
            size_bytes: Some(f.size_bytes),
            content_type: Some(f.content_type),
        }));
        Ok(entries)
    }
}
