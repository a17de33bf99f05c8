//! Per-project advisory file lock serializing scans across processes.
//! Queries never take this lock.

use crate::error::{IndexerError, Result};
use fs2::FileExt;
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = "scan.lock";

pub(crate) struct ScanLock {
    file: std::fs::File,
}

impl Drop for ScanLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn lock_path(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE_NAME)
}

pub(crate) async fn acquire_scan_lock(state_dir: &Path) -> Result<ScanLock> {
    let path = lock_path(state_dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::task::spawn_blocking(move || -> Result<ScanLock> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| IndexerError::Other(format!("open scan lock {}: {e}", path.display())))?;

        file.lock_exclusive()
            .map_err(|e| IndexerError::Other(format!("acquire scan lock {}: {e}", path.display())))?;

        Ok(ScanLock { file })
    })
    .await
    .map_err(|e| IndexerError::Other(format!("join scan lock task: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lock_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        {
            let _lock = acquire_scan_lock(dir.path()).await.unwrap();
            assert!(lock_path(dir.path()).exists());
        }
        // Released on drop: a second acquisition succeeds.
        let _again = acquire_scan_lock(dir.path()).await.unwrap();
    }
}
