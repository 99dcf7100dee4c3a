//! Path normalization, tilde expansion, and containment checks

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::core::error::PathError;

/// Resolves raw user input into canonical, readable paths.
///
/// Inputs that contain `..` components must resolve inside one of the
/// allowed roots (home, the current directory, the system temp directory);
/// plain paths without traversal sequences are accepted anywhere.
pub struct PathResolver {
    allowed_roots: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new() -> Result<Self, PathError> {
        let home = home_dir().ok_or(PathError::NoHome)?;
        let mut allowed_roots = vec![home];
        if let Ok(cwd) = std::env::current_dir() {
            allowed_roots.push(cwd);
        }
        allowed_roots.push(std::env::temp_dir());

        Ok(Self { allowed_roots })
    }

    /// Normalize `raw` into an absolute path that exists and is readable.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathError> {
        let expanded = expand_tilde(raw)?;
        let has_traversal = expanded
            .components()
            .any(|c| matches!(c, Component::ParentDir));

        let canonical = expanded.canonicalize().map_err(|e| match e.kind() {
            ErrorKind::NotFound => PathError::NotFound(expanded.clone()),
            _ => PathError::Unreadable {
                path: expanded.clone(),
                source: e,
            },
        })?;

        check_readable(&canonical)?;

        if has_traversal
            && !self
                .allowed_roots
                .iter()
                .any(|root| canonical.starts_with(root))
        {
            return Err(PathError::Traversal(canonical));
        }

        Ok(canonical)
    }
}

/// Expand a leading `~` to the home directory. Other inputs pass through.
pub fn expand_tilde(raw: &str) -> Result<PathBuf, PathError> {
    if raw == "~" {
        return home_dir().ok_or(PathError::NoHome);
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        return Ok(home_dir().ok_or(PathError::NoHome)?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Normalize a configured search path: tilde-expanded, trailing slash
/// trimmed, canonicalized when it exists on disk.
pub fn normalize_search_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = if raw.len() > 1 {
        raw.trim_end_matches('/')
    } else {
        raw
    };
    let expanded = expand_tilde(trimmed)?;
    Ok(fs::canonicalize(&expanded).unwrap_or(expanded))
}

/// Whether `path` is equal to or nested under `root`.
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn check_readable(path: &Path) -> Result<(), PathError> {
    let result = if path.is_dir() {
        fs::read_dir(path).map(|_| ())
    } else {
        fs::File::open(path).map(|_| ())
    };
    result.map_err(|e| PathError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_existing_dir() {
        let tmp = tempdir().unwrap();
        let resolver = PathResolver::new().unwrap();
        let resolved = resolver.resolve(tmp.path().to_str().unwrap()).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        let resolver = PathResolver::new().unwrap();
        let err = resolver.resolve("/definitely/not/a/real/path").unwrap_err();
        assert!(matches!(err, PathError::NotFound(_)));
    }

    #[test]
    fn test_expand_tilde() {
        let home = home_dir().unwrap();
        assert_eq!(expand_tilde("~").unwrap(), home);
        assert_eq!(expand_tilde("~/projects").unwrap(), home.join("projects"));
        assert_eq!(expand_tilde("/opt/x").unwrap(), PathBuf::from("/opt/x"));
    }

    #[test]
    fn test_traversal_inside_allowed_root_is_ok() {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("a/b");
        fs::create_dir_all(&sub).unwrap();
        let raw = format!("{}/a/b/../b", tmp.path().display());

        // tempdir lives under the system temp dir, which is an allowed root
        let resolver = PathResolver::new().unwrap();
        let resolved = resolver.resolve(&raw).unwrap();
        assert_eq!(resolved, sub.canonicalize().unwrap());
    }

    #[test]
    fn test_traversal_escaping_allowed_roots_fails() {
        let resolver = PathResolver {
            allowed_roots: vec![PathBuf::from("/nonexistent-root")],
        };
        let err = resolver.resolve("/etc/../etc").unwrap_err();
        assert!(matches!(err, PathError::Traversal(_)));
    }

    #[test]
    fn test_normalize_search_path_trims_trailing_slash() {
        let normalized = normalize_search_path("/no/such/dir/").unwrap();
        assert_eq!(normalized, PathBuf::from("/no/such/dir"));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/a/b/c"), Path::new("/a/b")));
        assert!(is_within(Path::new("/a/b"), Path::new("/a/b")));
        assert!(!is_within(Path::new("/a/bc"), Path::new("/a/b")));
    }
}
