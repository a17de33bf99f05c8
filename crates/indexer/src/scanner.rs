use crate::error::{IndexerError, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use weaver_protocol::ExcludeFilter;

/// A candidate file found by the crawler.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    pub mtime: i64,
}

/// Repository crawler: walks the tree, applies exclude patterns, and never
/// follows symlinks out of the root.
pub struct Scanner {
    root: PathBuf,
    filter: ExcludeFilter,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>, user_patterns: &[String]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        let filter = ExcludeFilter::new(user_patterns)
            .map_err(|e| IndexerError::Other(format!("invalid ignore pattern: {e}")))?;
        Ok(Self { root, filter })
    }

    /// Enumerate candidate files, sorted by relative path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let mut files = Vec::new();

        for entry in WalkBuilder::new(&self.root)
            .hidden(false)
            .follow_links(false)
            .build()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let relative_path = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            if self.filter.is_excluded(&relative_path) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    log::warn!("failed to stat {relative_path}: {e}");
                    continue;
                }
            };
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            files.push(ScannedFile {
                relative_path,
                absolute_path: entry.path().to_path_buf(),
                size: metadata.len(),
                mtime,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        log::info!("scanner found {} candidate files", files.len());
        Ok(files)
    }
}
