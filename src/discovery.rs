//! Project root discovery.
//!
//! This module provides the "environment resolution" layer that locates the
//! project root from any working directory. A project root is the directory
//! that contains a `.arclient` configuration directory.
//!
//! Resolution priority:
//!
//! 1. The `ARAC_PROJECT_PATH` environment variable, when it names an existing
//!    directory (no directory walk occurs in that case)
//! 2. Walking up from the starting directory until a `.arclient` directory is
//!    found or the filesystem root is reached
//!
//! An override that is set but does not exist is reported as `NotFound` rather
//! than silently ignored, so the caller can surface the misconfiguration.

use crate::error::{AracError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable that overrides project root discovery.
pub const ARAC_PROJECT_PATH_ENV: &str = "ARAC_PROJECT_PATH";

/// Name of the configuration marker directory.
pub const ARCLIENT_DIR: &str = ".arclient";

/// Name of the configuration document within the marker directory.
pub const CONFIG_FILE: &str = "config.json";

/// Absolute path to a located project root.
///
/// Immutable once resolved; all relative paths in the configuration are
/// anchored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    /// The root directory path.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Path to the `.arclient` configuration directory.
    pub fn arclient_dir(&self) -> PathBuf {
        self.0.join(ARCLIENT_DIR)
    }

    /// Path to the `config.json` configuration document.
    pub fn config_path(&self) -> PathBuf {
        self.arclient_dir().join(CONFIG_FILE)
    }
}

impl std::fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Discover the project root from the current working directory.
///
/// Consults `ARAC_PROJECT_PATH` first, then walks up from the current
/// directory looking for a `.arclient` marker.
pub fn discover() -> Result<ProjectRoot> {
    let cwd = std::env::current_dir().map_err(|e| {
        AracError::NotFound(format!("failed to get current working directory: {}", e))
    })?;
    let override_path = std::env::var(ARAC_PROJECT_PATH_ENV).ok();
    discover_from(&cwd, override_path.as_deref())
}

/// Discover the project root from a specific starting directory.
///
/// # Arguments
///
/// * `start_dir` - Directory to start the ancestor walk from
/// * `override_path` - Explicit root override (the `ARAC_PROJECT_PATH` value),
///   consulted before any walk
///
/// # Returns
///
/// * `Ok(ProjectRoot)` - The directory containing the `.arclient` marker
/// * `Err(AracError::NotFound)` - No marker on the path to the filesystem
///   root, or the override is set but does not name an existing directory
pub fn discover_from(start_dir: &Path, override_path: Option<&str>) -> Result<ProjectRoot> {
    if let Some(overridden) = override_path.filter(|p| !p.trim().is_empty()) {
        let path = Path::new(overridden);
        if path.is_dir() {
            let root = ProjectRoot(absolute(path));
            debug!(root = %root, "project root taken from {}", ARAC_PROJECT_PATH_ENV);
            return Ok(root);
        }
        return Err(AracError::NotFound(format!(
            "{} is set to '{}', which is not an existing directory",
            ARAC_PROJECT_PATH_ENV, overridden
        )));
    }

    let start = absolute(start_dir);
    let mut current: Option<&Path> = Some(&start);
    while let Some(dir) = current {
        if dir.join(ARCLIENT_DIR).is_dir() {
            let root = ProjectRoot(dir.to_path_buf());
            debug!(root = %root, "project root located by directory walk");
            return Ok(root);
        }
        current = dir.parent();
    }

    Err(AracError::NotFound(format!(
        "no {} directory found in '{}' or any of its ancestors",
        ARCLIENT_DIR,
        start.display()
    )))
}

/// Find the `.arclient` directory under a project root, if present.
pub fn find_arclient_dir(root: &ProjectRoot) -> Option<PathBuf> {
    let path = root.arclient_dir();
    path.is_dir().then_some(path)
}

/// Check that the project has the expected structure (marker directory plus
/// configuration document).
pub fn has_valid_structure(root: &ProjectRoot) -> bool {
    find_arclient_dir(root).is_some() && root.config_path().is_file()
}

/// Normalize a path to an absolute one without touching the filesystem.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".arclient")).unwrap();
        fs::create_dir_all(temp.path().join("docs/notes/archive")).unwrap();
        temp
    }

    #[test]
    fn test_discover_from_root_itself() {
        let temp = make_project();
        let root = discover_from(temp.path(), None).unwrap();
        assert_eq!(root.path(), std::path::absolute(temp.path()).unwrap());
    }

    #[test]
    fn test_discover_from_any_depth() {
        let temp = make_project();
        let expected = std::path::absolute(temp.path()).unwrap();

        for sub in ["docs", "docs/notes", "docs/notes/archive"] {
            let root = discover_from(&temp.path().join(sub), None).unwrap();
            assert_eq!(root.path(), expected, "starting from {}", sub);
        }
    }

    #[test]
    fn test_discover_without_marker_is_not_found() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("plain/dir")).unwrap();

        let result = discover_from(&temp.path().join("plain/dir"), None);
        assert!(matches!(result, Err(AracError::NotFound(_))));
    }

    #[test]
    fn test_override_wins_over_walk() {
        let walked = make_project();
        let overridden = make_project();

        let over = overridden.path().to_string_lossy().to_string();
        let root = discover_from(walked.path(), Some(&over)).unwrap();
        assert_eq!(root.path(), std::path::absolute(overridden.path()).unwrap());
    }

    #[test]
    fn test_nonexistent_override_is_not_found() {
        let temp = make_project();

        // Even though the walk would succeed, a bad override must not be ignored.
        let result = discover_from(temp.path(), Some("/definitely/not/a/real/path"));
        assert!(matches!(result, Err(AracError::NotFound(_))));
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains(ARAC_PROJECT_PATH_ENV));
    }

    #[test]
    fn test_empty_override_falls_through_to_walk() {
        let temp = make_project();
        let root = discover_from(temp.path(), Some("")).unwrap();
        assert_eq!(root.path(), std::path::absolute(temp.path()).unwrap());
    }

    #[test]
    fn test_project_root_paths() {
        let temp = make_project();
        let root = discover_from(temp.path(), None).unwrap();

        assert!(root.arclient_dir().ends_with(".arclient"));
        assert!(root.config_path().ends_with(".arclient/config.json"));
    }

    #[test]
    fn test_has_valid_structure() {
        let temp = make_project();
        let root = discover_from(temp.path(), None).unwrap();

        assert!(find_arclient_dir(&root).is_some());
        assert!(!has_valid_structure(&root));

        fs::write(root.config_path(), "{}").unwrap();
        assert!(has_valid_structure(&root));
    }
}
