use crate::error::{Result, VectorStoreError};
use crate::types::{dot, normalize_in_place, ChunkRecord, VectorHit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use weaver_code_chunker::Chunk;

const STORE_SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "index.json";

#[derive(Serialize, Deserialize)]
struct PersistedStore {
    schema_version: u32,
    dimension: usize,
    files: BTreeMap<String, Vec<ChunkRecord>>,
}

struct StoreInner {
    files: HashMap<String, Vec<ChunkRecord>>,
}

/// Persistent vector store keyed by relative path.
///
/// All mutation batches persist before returning; readers share a snapshot
/// through the interior lock.
pub struct VectorStore {
    path: PathBuf,
    dimension: usize,
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    /// Open or create the store under `dir`, validating the vector width.
    pub async fn open(dir: impl AsRef<Path>, dimension: usize) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(STORE_FILE_NAME);

        let files = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let raw = tokio::fs::read_to_string(&path).await?;
            let persisted: PersistedStore = serde_json::from_str(&raw)?;
            if persisted.schema_version != STORE_SCHEMA_VERSION {
                return Err(VectorStoreError::UnsupportedSchema(
                    persisted.schema_version,
                ));
            }
            if persisted.dimension != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: persisted.dimension,
                });
            }
            persisted.files.into_iter().collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            dimension,
            inner: RwLock::new(StoreInner { files }),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Atomically replace the chunk set of each given file.
    ///
    /// New rows are installed first; rows whose `file_hash` differs from the
    /// incoming version are dropped afterwards, so the file's chunks are
    /// never entirely invisible to a concurrent reader.
    pub async fn batch_upsert_files(
        &self,
        files: Vec<(String, Vec<ChunkRecord>)>,
    ) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }

        for (_, records) in &files {
            for record in records {
                if record.vector.len() != self.dimension {
                    return Err(VectorStoreError::InvalidDimension {
                        expected: self.dimension,
                        actual: record.vector.len(),
                    });
                }
            }
        }

        {
            let mut inner = self.inner.write().await;
            for (path, mut records) in files {
                for record in &mut records {
                    normalize_in_place(&mut record.vector);
                }
                let incoming_hash = records.first().map(|r| r.chunk.file_hash.clone());
                let slot = inner.files.entry(path).or_default();
                slot.extend(records);
                if let Some(hash) = incoming_hash {
                    slot.retain(|r| r.chunk.file_hash == hash);
                }
                slot.sort_by_key(|r| r.chunk.chunk_index);
            }
        }

        self.save().await
    }

    /// Remove all rows for the listed paths.
    pub async fn delete_files(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        {
            let mut inner = self.inner.write().await;
            for path in paths {
                inner.files.remove(path);
            }
        }
        self.save().await
    }

    /// Approximate nearest neighbors by cosine similarity.
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&(dyn Fn(&Chunk) -> bool + Send + Sync)>,
    ) -> Result<Vec<VectorHit>> {
        if query_vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let mut query = query_vector.to_vec();
        normalize_in_place(&mut query);

        let inner = self.inner.read().await;
        let mut hits: Vec<VectorHit> = inner
            .files
            .values()
            .flatten()
            .filter(|record| filter.map_or(true, |f| f(&record.chunk)))
            .map(|record| VectorHit {
                record: record.clone(),
                score: dot(&query, &record.vector),
            })
            .collect();
        drop(inner);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.chunk_id().cmp(&b.record.chunk_id()))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    /// Number of stored chunk records.
    pub async fn count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.files.values().map(Vec::len).sum()
    }

    /// Drop everything and persist the empty state.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut inner = self.inner.write().await;
            inner.files.clear();
        }
        self.save().await
    }

    /// Chunk records of one file, ordered by chunk index.
    pub async fn chunks_for_file(&self, relative_path: &str) -> Option<Vec<ChunkRecord>> {
        let inner = self.inner.read().await;
        inner.files.get(relative_path).cloned()
    }

    /// One chunk record by (path, index).
    pub async fn get(&self, relative_path: &str, chunk_index: usize) -> Option<ChunkRecord> {
        let inner = self.inner.read().await;
        inner
            .files
            .get(relative_path)?
            .iter()
            .find(|r| r.chunk.chunk_index == chunk_index)
            .cloned()
    }

    /// All indexed file paths.
    pub async fn file_paths(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut paths: Vec<String> = inner.files.keys().cloned().collect();
        paths.sort();
        paths
    }

    async fn save(&self) -> Result<()> {
        let persisted = {
            let inner = self.inner.read().await;
            PersistedStore {
                schema_version: STORE_SCHEMA_VERSION,
                dimension: self.dimension,
                files: inner
                    .files
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            }
        };

        let raw = serde_json::to_string(&persisted)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
