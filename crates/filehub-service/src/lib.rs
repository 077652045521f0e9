//! # filehub-service
//!
//! Business logic for FileHub sharing. Each service combines the
//! persistence stores, the object store and the permission resolver into
//! one use case; [`Services`] wires them all together.
//!
//! Services are cheap to clone and hold no per-request state. Identity and
//! deadlines travel in a [`RequestContext`].

pub mod context;
pub mod file;
pub mod folder;
pub mod permission;
pub mod registry;
pub mod share;
pub mod stores;
pub mod trash;

pub use context::RequestContext;
pub use file::{BatchUploadReport, DownloadGrant, DownloadService, FileService, UploadRequest, UploadService};
pub use folder::FolderService;
pub use permission::{CollaboratorService, PermissionService};
pub use registry::Services;
pub use share::{AccessDecision, DenialReason, ShareAccessService, ShareService};
pub use stores::Stores;
pub use trash::{PurgeReport, TrashService};
