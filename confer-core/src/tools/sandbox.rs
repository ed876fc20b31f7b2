//! Path confinement for file and git tools
//!
//! Every path a tool receives is resolved against the workspace root. The
//! check is lexical first, so a request such as `../../etc/passwd` is
//! rejected without touching the target. Paths that exist are then
//! canonicalized and checked again to catch symlinks pointing outside.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Text returned by tools when a path escapes the workspace
pub const ACCESS_DENIED: &str = "Access denied.";

/// A requested path resolved outside the workspace root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ACCESS_DENIED)
    }
}

/// Confines tool paths to one directory tree
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`, which must exist
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| {
            Error::Config(format!(
                "Workspace root '{}' cannot be resolved: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// The canonical workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a requested path, relative paths being taken from the root
    pub fn resolve(&self, requested: &str) -> std::result::Result<PathBuf, AccessDenied> {
        let requested = requested.trim();
        let requested = if requested.is_empty() { "." } else { requested };

        let joined = self.root.join(requested);
        let normalized = normalize(&joined).ok_or(AccessDenied)?;
        if !normalized.starts_with(&self.root) {
            return Err(AccessDenied);
        }

        // Only existing paths can hide a symlink escape.
        if normalized.symlink_metadata().is_ok() {
            let canonical = normalized.canonicalize().map_err(|_| AccessDenied)?;
            if !canonical.starts_with(&self.root) {
                return Err(AccessDenied);
            }
            return Ok(canonical);
        }

        Ok(normalized)
    }

    /// Path relative to the root, for display and git pathspecs
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

/// Lexically fold `.` and `..`; `None` when `..` climbs above the filesystem root
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sandbox() -> (TempDir, Sandbox) {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "pub fn x() {}").unwrap();
        let sandbox = Sandbox::new(dir.path()).unwrap();
        (dir, sandbox)
    }

    #[test]
    fn test_relative_path_inside_root() {
        let (_dir, sandbox) = sandbox();
        let path = sandbox.resolve("src/lib.rs").unwrap();
        assert!(path.starts_with(sandbox.root()));
        assert!(path.ends_with("src/lib.rs"));
    }

    #[test]
    fn test_traversal_is_denied() {
        let (_dir, sandbox) = sandbox();
        assert_eq!(sandbox.resolve("../../etc/passwd"), Err(AccessDenied));
        assert_eq!(sandbox.resolve("src/../../outside"), Err(AccessDenied));
    }

    #[test]
    fn test_absolute_path_outside_root_is_denied() {
        let (_dir, sandbox) = sandbox();
        assert_eq!(sandbox.resolve("/etc/passwd"), Err(AccessDenied));
    }

    #[test]
    fn test_inner_dotdot_that_stays_inside_is_allowed() {
        let (_dir, sandbox) = sandbox();
        let path = sandbox.resolve("src/../src/lib.rs").unwrap();
        assert!(path.ends_with("src/lib.rs"));
    }

    #[test]
    fn test_missing_path_inside_root_resolves() {
        let (_dir, sandbox) = sandbox();
        let path = sandbox.resolve("does/not/exist.txt").unwrap();
        assert!(path.starts_with(sandbox.root()));
    }

    #[test]
    fn test_empty_request_is_root() {
        let (_dir, sandbox) = sandbox();
        assert_eq!(sandbox.resolve("").unwrap(), sandbox.root());
        assert_eq!(sandbox.resolve(".").unwrap(), sandbox.root());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_denied() {
        let (dir, sandbox) = sandbox();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

        assert_eq!(sandbox.resolve("link/secret.txt"), Err(AccessDenied));
    }

    #[test]
    fn test_relative_display() {
        let (_dir, sandbox) = sandbox();
        let path = sandbox.resolve("src/lib.rs").unwrap();
        assert_eq!(sandbox.relative(&path), Path::new("src/lib.rs"));
    }

    #[test]
    fn test_missing_root_is_config_error() {
        assert!(matches!(
            Sandbox::new("/definitely/not/a/real/root"),
            Err(Error::Config(_))
        ));
    }
}
