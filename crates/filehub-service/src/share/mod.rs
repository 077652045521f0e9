//! Share links: creation and management by owners, anonymous access by token.

pub mod access;
pub mod service;

pub use access::{AccessDecision, DenialReason, ShareAccessService};
pub use service::{CreateShareLinkRequest, ShareService, UpdateShareLinkRequest};
