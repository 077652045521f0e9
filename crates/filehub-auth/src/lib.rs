//! # filehub-auth
//!
//! Authorization primitives for FileHub sharing.
//!
//! ## Modules
//!
//! - `acl`: pure permission resolution over owner, grants and visibility
//! - `password`: Argon2id hashing of share link passwords
//! - `token`: CSPRNG share link tokens

pub mod acl;
pub mod password;
pub mod token;

pub use acl::{AccessLevel, Principal, ResourceAccess};
pub use password::PasswordHasher;
pub use token::generate_share_token;
