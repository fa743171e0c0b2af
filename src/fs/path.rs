use crate::fs::error::{FsError, FsResult};
use std::borrow::Cow;

const MAX_PATH_LENGTH: usize = 4096;
const MAX_FILENAME_LENGTH: usize = 255;

pub fn normalize_path(path: &str) -> FsResult<String> {
    if path.is_empty() {
        return Err(FsError::InvalidPath("Empty path".to_string()));
    }

    if path.contains('\0') {
        return Err(FsError::InvalidPath("Path contains NULL character".to_string()));
    }

    if path.len() > MAX_PATH_LENGTH {
        return Err(FsError::PathTooLong(path.len()));
    }

    if !path.starts_with('/') {
        return Err(FsError::InvalidPath("Path must start with /".to_string()));
    }

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    for part in &parts {
        if part.len() > MAX_FILENAME_LENGTH {
            return Err(FsError::FilenameTooLong(part.len()));
        }
    }

    Ok(format!("/{}", parts.join("/")))
}

pub fn path_components(path: &str) -> FsResult<Vec<String>> {
    let normalized = normalize_path(path)?;
    Ok(normalized.split('/').filter(|s| !s.is_empty()).map(|s| s.to_string()).collect())
}

pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" { format!("/{}", name) } else { format!("{}/{}", parent, name) }
}

/// Parent of an absolute path. The root is its own parent.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// Stands in for `/` inside remote display names.
pub const SLASH_SUBSTITUTE: char = '\u{2215}';

/// A remote display name as it appears in a path segment: every `/` becomes
/// DIVISION SLASH (U+2215).
pub fn segment_name(name: &str) -> Cow<'_, str> {
    if name.contains('/') {
        Cow::Owned(name.replace('/', &SLASH_SUBSTITUTE.to_string()))
    } else {
        Cow::Borrowed(name)
    }
}

/// Whether a remote display name can appear as a single path segment.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\0')
        && name.len() <= MAX_FILENAME_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_root() {
        assert_eq!(normalize_path("/").unwrap(), "/");
    }

    #[test]
    fn test_normalize_path_with_spaces() {
        assert_eq!(normalize_path("/My workspace/burn").unwrap(), "/My workspace/burn");
    }

    #[test]
    fn test_normalize_path_trailing_and_repeated_slashes() {
        assert_eq!(normalize_path("//My workspace//burn/").unwrap(), "/My workspace/burn");
    }

    #[test]
    fn test_normalize_path_empty() {
        assert!(normalize_path("").is_err());
    }

    #[test]
    fn test_normalize_path_no_leading_slash() {
        assert!(matches!(normalize_path("burn"), Err(FsError::InvalidPath(_))));
    }

    #[test]
    fn test_normalize_path_segment_too_long() {
        let path = format!("/{}", "x".repeat(300));
        assert_eq!(normalize_path(&path), Err(FsError::FilenameTooLong(300)));
    }

    #[test]
    fn test_path_components_root() {
        assert!(path_components("/").unwrap().is_empty());
    }

    #[test]
    fn test_path_components_task() {
        let components = path_components("/My workspace/burn/Pack lists").unwrap();
        assert_eq!(components, vec!["My workspace", "burn", "Pack lists"]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "My workspace"), "/My workspace");
        assert_eq!(join_path("/My workspace", "burn"), "/My workspace/burn");
    }

    #[test]
    fn test_parent_path() {
        assert_eq!(parent_path("/"), "/");
        assert_eq!(parent_path("/My workspace"), "/");
        assert_eq!(parent_path("/My workspace/burn"), "/My workspace");
    }

    #[test]
    fn test_is_valid_name() {
        assert!(is_valid_name("Pack lists"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("."));
        assert!(!is_valid_name(".."));
        assert!(!is_valid_name("Q1/Q2 planning"));
        assert!(is_valid_name(&segment_name("Q1/Q2 planning")));
    }

    #[test]
    fn test_segment_name_substitutes_slashes() {
        assert!(matches!(segment_name("Pack lists"), Cow::Borrowed("Pack lists")));
        assert_eq!(segment_name("Q1/Q2 planning"), "Q1\u{2215}Q2 planning");
        assert_eq!(segment_name("a//b/"), "a\u{2215}\u{2215}b\u{2215}");
    }
}
