use crate::error::{IndexerError, Result};
use crate::index_lock::acquire_scan_lock;
use crate::metadata::{FileRecord, FtsRow, MetadataStore};
use crate::scanner::Scanner;
use crate::stats::ScanStats;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use weaver_code_chunker::{parser_pool, Chunk, Chunker, ChunkerConfig, Language};
use weaver_embeddings::{Embedder, ProgressSender};
use weaver_protocol::{project_state_dir, IndexConfig};
use weaver_vector_store::{ChunkRecord, VectorStore, VectorStoreError};

/// Scan behavior switches.
#[derive(Clone, Default)]
pub struct ScanOptions {
    /// Reprocess every file regardless of stored hashes.
    pub force: bool,

    /// Write embeddings and FTS rows. When false only file records are
    /// refreshed.
    pub vector_index: bool,

    /// Drained by the caller for progress display.
    pub progress: Option<ProgressSender>,
}

impl ScanOptions {
    pub fn vector_indexed() -> Self {
        Self {
            force: false,
            vector_index: true,
            progress: None,
        }
    }
}

/// Current index shape, for health output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStatus {
    pub files: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// A file read during classification, waiting for the chunker.
struct Pending {
    relative_path: String,
    content: String,
    content_hash: String,
}

/// Orchestrates chunk → embed → store writes and keeps both stores
/// consistent with file contents across incremental scans.
pub struct Indexer {
    root: PathBuf,
    state_dir: PathBuf,
    chunker: Arc<Chunker>,
    meta: MetadataStore,
    vectors: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: IndexConfig,
}

impl Indexer {
    /// Open the indexer with state under the per-project directory.
    pub async fn open(
        root: impl AsRef<Path>,
        config: IndexConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let state_dir = project_state_dir(root.as_ref())?;
        Self::open_at(root, state_dir, config, embedder).await
    }

    /// Open with an explicit state directory.
    pub async fn open_at(
        root: impl AsRef<Path>,
        state_dir: impl AsRef<Path>,
        config: IndexConfig,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        let state_dir = state_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&state_dir).await?;

        let meta = MetadataStore::open(&state_dir)?;
        let dimension = embedder.dimension();
        let vectors_dir = state_dir.join("vectors");

        let vectors = match VectorStore::open(&vectors_dir, dimension).await {
            Ok(store) => store,
            Err(
                VectorStoreError::InvalidDimension { .. } | VectorStoreError::UnsupportedSchema(_),
            ) => {
                log::warn!("vector store incompatible with dimension {dimension}; rebuilding");
                let _ = tokio::fs::remove_dir_all(&vectors_dir).await;
                meta.clear_all().await?;
                VectorStore::open(&vectors_dir, dimension).await?
            }
            Err(e) => return Err(e.into()),
        };

        // The dimension pane can disagree even when the store file was
        // deleted out-of-band; a mismatch always means a full rebuild.
        if let Some(recorded) = meta.recorded_dimension().await? {
            if recorded != dimension {
                log::warn!(
                    "embedding dimension changed ({recorded} -> {dimension}); rebuilding index"
                );
                meta.clear_all().await?;
                vectors.clear().await?;
            }
        }
        meta.record_dimension(dimension).await?;

        let chunker = Arc::new(Chunker::new(ChunkerConfig::default())?);

        Ok(Self {
            root,
            state_dir,
            chunker,
            meta,
            vectors: Arc::new(vectors),
            embedder,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn vector_store(&self) -> Arc<VectorStore> {
        Arc::clone(&self.vectors)
    }

    pub fn metadata_store(&self) -> MetadataStore {
        self.meta.clone()
    }

    /// Index file/chunk counts and the active dimension.
    pub async fn status(&self) -> Result<IndexStatus> {
        Ok(IndexStatus {
            files: self.meta.file_count().await?,
            chunks: self.vectors.count().await,
            dimension: self.vectors.dimension(),
        })
    }

    /// Run one scan: classify files, re-chunk and re-embed what changed,
    /// heal stale entries, and drop rows for deleted paths.
    pub async fn scan(&self, options: ScanOptions) -> Result<ScanStats> {
        let start = Instant::now();
        let _lock = acquire_scan_lock(&self.state_dir).await?;
        let mut stats = ScanStats::default();

        let scanner = Scanner::new(&self.root, &self.config.ignore_patterns)?;
        let scanned = scanner.scan()?;
        let known: HashMap<String, FileRecord> = self
            .meta
            .all_files()
            .await?
            .into_iter()
            .map(|r| (r.relative_path.clone(), r))
            .collect();

        let mut to_chunk: Vec<Pending> = Vec::new();
        let mut records: Vec<FileRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for file in &scanned {
            seen.insert(file.relative_path.clone());

            let bytes = match tokio::fs::read(&file.absolute_path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("skipping unreadable file {}: {e}", file.relative_path);
                    stats.skipped += 1;
                    continue;
                }
            };
            let content = match String::from_utf8(bytes) {
                Ok(content) => content,
                Err(_) => {
                    log::debug!("skipping non-utf8 file {}", file.relative_path);
                    stats.skipped += 1;
                    continue;
                }
            };
            let content_hash = content_hash_hex(&content);
            let language = Language::from_path(&file.relative_path).as_str().to_string();

            let previous = known.get(&file.relative_path);
            let changed =
                options.force || previous.map_or(true, |p| p.content_hash != content_hash);

            if changed {
                if previous.is_some() {
                    stats.modified += 1;
                } else {
                    stats.added += 1;
                }
                records.push(FileRecord {
                    relative_path: file.relative_path.clone(),
                    content_hash: content_hash.clone(),
                    mtime: file.mtime,
                    size: file.size as i64,
                    language,
                    vector_index_hash: None,
                });
                to_chunk.push(Pending {
                    relative_path: file.relative_path.clone(),
                    content,
                    content_hash,
                });
            } else {
                stats.unchanged += 1;
                let stale = previous.map_or(true, |p| {
                    p.vector_index_hash.as_deref() != Some(content_hash.as_str())
                });
                records.push(FileRecord {
                    relative_path: file.relative_path.clone(),
                    content_hash: content_hash.clone(),
                    mtime: file.mtime,
                    size: file.size as i64,
                    language,
                    vector_index_hash: previous.and_then(|p| p.vector_index_hash.clone()),
                });
                if stale && options.vector_index {
                    // Self-heal: the last scan crashed between the vector
                    // write and the metadata update for this file.
                    to_chunk.push(Pending {
                        relative_path: file.relative_path.clone(),
                        content,
                        content_hash,
                    });
                }
            }
        }

        let deleted_paths: Vec<String> = known
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();
        stats.deleted = deleted_paths.len();

        self.meta.upsert_files(records).await?;

        if !options.vector_index {
            to_chunk.clear();
        }
        let chunked = self.chunk_pending(to_chunk).await?;

        if options.vector_index {
            self.apply_chunked(chunked, &options, &mut stats).await?;
        }

        if !deleted_paths.is_empty() {
            self.vectors.delete_files(&deleted_paths).await?;
            if let Err(e) = self.meta.fts_delete_files(deleted_paths.clone()).await {
                log::warn!("FTS delete failed (vector store authoritative): {e}");
            }
            self.meta.delete_files(deleted_paths.clone()).await?;
            stats.vector_index.deleted = deleted_paths.len();
        }

        parser_pool::shutdown();
        stats.time_ms = start.elapsed().as_millis() as u64;
        log::info!("scan completed: {stats}");
        Ok(stats)
    }

    /// Chunk pending files on the blocking pool, a bounded batch at a time.
    async fn chunk_pending(
        &self,
        pending: Vec<Pending>,
    ) -> Result<Vec<(String, String, Vec<Chunk>)>> {
        let parallelism = self.config.chunk_parallelism.max(1);
        let mut iterator = pending.into_iter();
        let mut chunked = Vec::new();

        loop {
            let mut handles = Vec::new();
            for pending in iterator.by_ref().take(parallelism) {
                let chunker = Arc::clone(&self.chunker);
                handles.push(tokio::task::spawn_blocking(move || {
                    let chunks = chunker.chunk_file(
                        &pending.relative_path,
                        &pending.content,
                        &pending.content_hash,
                    );
                    (pending.relative_path, pending.content_hash, chunks)
                }));
            }
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                chunked.push(
                    handle
                        .await
                        .map_err(|e| IndexerError::Other(format!("chunk task failed: {e}")))?,
                );
            }
        }
        Ok(chunked)
    }

    /// Embed chunked files in one batch and write both stores.
    async fn apply_chunked(
        &self,
        chunked: Vec<(String, String, Vec<Chunk>)>,
        options: &ScanOptions,
        stats: &mut ScanStats,
    ) -> Result<()> {
        let (index_files, empty_files): (Vec<_>, Vec<_>) =
            chunked.into_iter().partition(|(_, _, chunks)| !chunks.is_empty());

        // Files that became empty lose their rows but stay consistent.
        if !empty_files.is_empty() {
            let paths: Vec<String> = empty_files.iter().map(|(p, _, _)| p.clone()).collect();
            self.vectors.delete_files(&paths).await?;
            if let Err(e) = self.meta.fts_delete_files(paths).await {
                log::warn!("FTS delete failed (vector store authoritative): {e}");
            }
            self.meta
                .set_vector_index_hash(
                    empty_files
                        .iter()
                        .map(|(p, h, _)| (p.clone(), Some(h.clone())))
                        .collect(),
                )
                .await?;
        }

        if index_files.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = index_files
            .iter()
            .flat_map(|(_, _, chunks)| chunks.iter().map(|c| c.vector_text.clone()))
            .collect();

        let vectors = match self
            .embedder
            .embed_batch(&texts, options.progress.clone())
            .await
        {
            Ok(vectors) if vectors.len() == texts.len() => vectors,
            Ok(vectors) => {
                log::warn!(
                    "embedder returned {} vectors for {} texts; marking files dirty",
                    vectors.len(),
                    texts.len()
                );
                self.mark_dirty(&index_files, stats).await?;
                return Ok(());
            }
            Err(e) => {
                log::warn!("embedding failed; files remain dirty for the next scan: {e}");
                self.mark_dirty(&index_files, stats).await?;
                return Ok(());
            }
        };

        let mut cursor = 0;
        let mut upserts = Vec::new();
        let mut fts_rows = Vec::new();
        let mut paths = Vec::new();
        let mut hash_updates = Vec::new();

        for (path, hash, chunks) in &index_files {
            let file_vectors = &vectors[cursor..cursor + chunks.len()];
            cursor += chunks.len();

            let chunk_records: Vec<ChunkRecord> = chunks
                .iter()
                .zip(file_vectors)
                .map(|(chunk, vector)| ChunkRecord {
                    chunk: chunk.clone(),
                    vector: vector.clone(),
                })
                .collect();
            upserts.push((path.clone(), chunk_records));

            for chunk in chunks {
                fts_rows.push(FtsRow {
                    chunk_id: chunk.chunk_id(),
                    relative_path: chunk.relative_path.clone(),
                    chunk_index: chunk.chunk_index,
                    breadcrumb: chunk.breadcrumb.clone(),
                    body: chunk.vector_text.clone(),
                });
            }
            paths.push(path.clone());
            hash_updates.push((path.clone(), Some(hash.clone())));
        }

        match self.vectors.batch_upsert_files(upserts).await {
            Ok(()) => {
                if let Err(e) = self.meta.fts_replace_files(paths, fts_rows).await {
                    log::warn!("FTS update failed (vector store authoritative): {e}");
                }
                self.meta.set_vector_index_hash(hash_updates).await?;
                stats.vector_index.indexed = index_files.len();
            }
            Err(e) => {
                log::warn!("vector store write failed: {e}");
                self.mark_dirty(&index_files, stats).await?;
            }
        }
        Ok(())
    }

    async fn mark_dirty(
        &self,
        index_files: &[(String, String, Vec<Chunk>)],
        stats: &mut ScanStats,
    ) -> Result<()> {
        self.meta
            .set_vector_index_hash(
                index_files
                    .iter()
                    .map(|(path, _, _)| (path.clone(), None))
                    .collect(),
            )
            .await?;
        stats.vector_index.errors += index_files.len();
        stats.errors += index_files.len();
        Ok(())
    }
}

fn content_hash_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_and_hex() {
        let a = content_hash_hex("fn main() {}");
        let b = content_hash_hex("fn main() {}");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_contents_hash_differently() {
        assert_ne!(content_hash_hex("a"), content_hash_hex("b"));
    }
}
