//! Object key construction and validation.
//!
//! Keys are namespaced by owner: `{owner_id}/{object_id}.{ext}`. User-supplied
//! file names never become part of a key.

use uuid::Uuid;

use filehub_core::error::StorageError;
use filehub_core::traits::storage::StorageResult;

/// Longest extension kept in a key.
const MAX_EXTENSION_LEN: usize = 16;

/// Build the object key for a new object.
///
/// The extension is kept only if it is short and purely alphanumeric;
/// anything else is dropped rather than escaped.
pub fn object_key(owner_id: Uuid, object_id: Uuid, extension: Option<&str>) -> String {
    match extension.and_then(sanitize_extension) {
        Some(ext) => format!("{owner_id}/{object_id}.{ext}"),
        None => format!("{owner_id}/{object_id}"),
    }
}

fn sanitize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim_start_matches('.');
    let valid = !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

/// Reject keys that could escape the backend namespace.
pub fn validate_key(backend: &'static str, key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StorageError::InvalidKey {
            backend,
            key: key.to_string(),
        });
    }
    Ok(())
}
