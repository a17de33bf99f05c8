use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Stable identifier of an indexed repository.
///
/// Derived from the canonical repository path and the creation timestamp of
/// its root directory, so a moved or recreated repository gets fresh state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the project id for a repository root.
pub fn project_id(repo_root: &Path) -> std::io::Result<ProjectId> {
    let canonical = std::fs::canonicalize(repo_root)?;
    let created = std::fs::metadata(&canonical)?
        .created()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.update(created.to_le_bytes());
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{byte:02x}"));
    }
    Ok(ProjectId(hex))
}

/// Directory holding all persistent state for a project:
/// `<user-config-dir>/contextweaver/<project-id>/`.
pub fn project_state_dir(repo_root: &Path) -> std::io::Result<PathBuf> {
    let id = project_id(repo_root)?;
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("contextweaver").join(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_project_id_is_stable() {
        let dir = TempDir::new().unwrap();
        let a = project_id(dir.path()).unwrap();
        let b = project_id(dir.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn test_distinct_roots_get_distinct_ids() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        assert_ne!(
            project_id(a.path()).unwrap(),
            project_id(b.path()).unwrap()
        );
    }

    #[test]
    fn test_missing_root_is_an_error() {
        assert!(project_id(Path::new("/nonexistent/repo/path")).is_err());
    }
}
