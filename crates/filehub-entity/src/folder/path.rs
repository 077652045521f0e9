//! Materialized path helpers.
//!
//! A folder's path is `parent.path + "/" + name`, or `"/" + name` for a
//! root folder. Paths are derived data: they are recomputed from the
//! parent chain whenever a folder is renamed or moved.

use filehub_core::error::AppError;

/// Maximum length of a single folder name.
pub const MAX_NAME_LEN: usize = 255;

/// Validate a folder name and return it trimmed.
pub fn validate_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Folder name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Folder name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid folder name '{name}'")));
    }
    Ok(name)
}

/// Compute the path of a folder named `name` under `parent_path`.
pub fn child_path(parent_path: Option<&str>, name: &str) -> String {
    match parent_path {
        Some(parent) => format!("{parent}/{name}"),
        None => format!("/{name}"),
    }
}

/// Whether `path` equals `ancestor` or lies beneath it.
///
/// Compares whole segments, so `/a/bc` is not inside `/a/b`.
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Rewrite `path` from under `old_prefix` to under `new_prefix`.
///
/// Returns `None` when `path` is not inside `old_prefix`.
pub fn rebase(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    let rest = path.strip_prefix(old_prefix)?;
    rest.starts_with('/').then(|| format!("{new_prefix}{rest}"))
}

/// Number of ancestors above the folder at `path`.
pub fn depth(path: &str) -> usize {
    path.matches('/').count().saturating_sub(1)
}

/// Validate a `#rrggbb` color tag.
pub fn validate_color(color: &str) -> Result<(), AppError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(format!("Invalid color '{color}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        assert_eq!(child_path(None, "docs"), "/docs");
        assert_eq!(child_path(Some("/docs"), "2024"), "/docs/2024");
    }

    #[test]
    fn test_descendant_check_uses_segments() {
        assert!(is_same_or_descendant("/a/b", "/a/b"));
        assert!(is_same_or_descendant("/a/b/c", "/a/b"));
        assert!(!is_same_or_descendant("/a/bc", "/a/b"));
        assert!(!is_same_or_descendant("/a", "/a/b"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("/a/b/c", "/a/b", "/x").as_deref(), Some("/x/c"));
        assert_eq!(rebase("/a/b", "/a/b", "/x/b").as_deref(), Some("/x/b"));
        assert_eq!(rebase("/a/bc", "/a/b", "/x"), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth("/a"), 0);
        assert_eq!(depth("/a/b/c"), 2);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Reports ").unwrap(), "Reports");
        assert!(validate_name("").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#1a2B3c").is_ok());
        assert!(validate_color("1a2b3c").is_err());
        assert!(validate_color("#12345g").is_err());
    }
}
