//! Share link entities.

pub mod link;
pub mod model;

pub use link::{OwnerProfile, PublicShareView, SharedEntry};
pub use model::{CreateShareLink, SharePermission, ShareLink, UpdateShareLink};
