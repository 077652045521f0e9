//! Workspace integration tests: the sharing services running against the
//! in-memory database and object store.

mod helpers;

mod folder_test;
mod permission_test;
mod share_test;
mod trash_test;
mod upload_test;
