use crate::imports::extract_imports;
use crate::resolvers::resolve_import;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use weaver_code_chunker::Language;
use weaver_protocol::{ExpandConfig, ExpansionPhase};
use weaver_vector_store::{ChunkRecord, VectorStore};

/// A recalled seed with its pipeline score.
#[derive(Debug, Clone)]
pub struct SeedChunk {
    pub record: ChunkRecord,
    pub score: f32,
}

/// A context chunk attached around a seed.
#[derive(Debug, Clone)]
pub struct ExpandedRecord {
    pub record: ChunkRecord,
    pub phase: ExpansionPhase,
    pub score: f32,
}

/// Three-phase context expansion around seeds, with per-file chunk and
/// import caches living for the expander's lifetime.
pub struct GraphExpander {
    root: PathBuf,
    vectors: Arc<VectorStore>,
    config: ExpandConfig,
    file_cache: Mutex<HashMap<String, Arc<Vec<ChunkRecord>>>>,
    import_cache: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl GraphExpander {
    pub fn new(root: impl AsRef<Path>, vectors: Arc<VectorStore>, config: ExpandConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            vectors,
            config,
            file_cache: Mutex::new(HashMap::new()),
            import_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Drop cached file/import lookups, e.g. after a scan invalidated them.
    pub async fn clear_caches(&self) {
        self.file_cache.lock().await.clear();
        self.import_cache.lock().await.clear();
    }

    /// Expand seeds through E1 (neighbors), E2 (breadcrumb siblings) and E3
    /// (imports), deduplicated against the seeds and each other.
    pub async fn expand(&self, seeds: &[SeedChunk]) -> Vec<ExpandedRecord> {
        let mut taken: HashSet<String> = seeds
            .iter()
            .map(|seed| seed.record.chunk_id())
            .collect();
        let mut out = Vec::new();

        self.expand_neighbors(seeds, &mut taken, &mut out).await;
        self.expand_breadcrumb_siblings(seeds, &mut taken, &mut out)
            .await;
        if self.config.import_files_per_seed > 0 {
            self.expand_imports(seeds, &mut taken, &mut out).await;
        }

        out
    }

    /// E1: up to `neighbor_hops` chunks before and after each seed.
    async fn expand_neighbors(
        &self,
        seeds: &[SeedChunk],
        taken: &mut HashSet<String>,
        out: &mut Vec<ExpandedRecord>,
    ) {
        for seed in seeds {
            let Some(chunks) = self.file_chunks(&seed.record.chunk.relative_path).await else {
                continue;
            };
            let seed_index = seed.record.chunk.chunk_index;

            for hop in 1..=self.config.neighbor_hops {
                let decayed = seed.score * self.config.neighbor_decay.powi(hop as i32);
                let mut indexes = Vec::new();
                if let Some(before) = seed_index.checked_sub(hop) {
                    indexes.push(before);
                }
                indexes.push(seed_index + hop);

                for index in indexes {
                    let Some(record) = chunks.iter().find(|r| r.chunk.chunk_index == index)
                    else {
                        continue;
                    };
                    if taken.insert(record.chunk_id()) {
                        out.push(ExpandedRecord {
                            record: record.clone(),
                            phase: ExpansionPhase::E1,
                            score: decayed,
                        });
                    }
                }
            }
        }
    }

    /// E2: same-file chunks sharing the seed's leading breadcrumb scope,
    /// closest chunk index first.
    async fn expand_breadcrumb_siblings(
        &self,
        seeds: &[SeedChunk],
        taken: &mut HashSet<String>,
        out: &mut Vec<ExpandedRecord>,
    ) {
        for seed in seeds {
            let breadcrumb = &seed.record.chunk.breadcrumb;
            if breadcrumb.is_empty() {
                continue;
            }
            let scope = leading_scope(breadcrumb);
            let Some(chunks) = self.file_chunks(&seed.record.chunk.relative_path).await else {
                continue;
            };
            let seed_index = seed.record.chunk.chunk_index;

            let mut siblings: Vec<&ChunkRecord> = chunks
                .iter()
                .filter(|r| {
                    !r.chunk.breadcrumb.is_empty() && leading_scope(&r.chunk.breadcrumb) == scope
                })
                .collect();
            siblings.sort_by_key(|r| r.chunk.chunk_index.abs_diff(seed_index));

            let mut included = 0;
            for sibling in siblings {
                if included >= self.config.breadcrumb_expand_limit {
                    break;
                }
                if taken.insert(sibling.chunk_id()) {
                    out.push(ExpandedRecord {
                        record: sibling.clone(),
                        phase: ExpansionPhase::E2,
                        score: seed.score * self.config.neighbor_decay,
                    });
                    included += 1;
                }
            }
        }
    }

    /// E3: resolve the seed file's imports and pull in chunks from the
    /// targets, preferring breadcrumbs that mention the seed's identifiers.
    async fn expand_imports(
        &self,
        seeds: &[SeedChunk],
        taken: &mut HashSet<String>,
        out: &mut Vec<ExpandedRecord>,
    ) {
        let known_paths: HashSet<String> = self.vectors.file_paths().await.into_iter().collect();

        for seed in seeds {
            let seed_path = &seed.record.chunk.relative_path;
            let language = Language::from_path(seed_path);
            let specifiers = self.file_imports(seed_path, language).await;

            let mut targets = Vec::new();
            for specifier in specifiers.iter() {
                if targets.len() >= self.config.import_files_per_seed {
                    break;
                }
                let Some(target) =
                    resolve_import(language, seed_path, specifier, &known_paths)
                else {
                    continue;
                };
                if target != *seed_path && !targets.contains(&target) {
                    targets.push(target);
                }
            }

            let identifiers = identifier_tokens(&seed.record.chunk.display_code);
            for target in targets {
                let Some(chunks) = self.file_chunks(&target).await else {
                    continue;
                };

                let mut ranked: Vec<&ChunkRecord> = chunks.iter().collect();
                ranked.sort_by(|a, b| {
                    breadcrumb_affinity(&b.chunk.breadcrumb, &identifiers)
                        .cmp(&breadcrumb_affinity(&a.chunk.breadcrumb, &identifiers))
                        .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
                });

                let mut included = 0;
                for record in ranked {
                    if included >= self.config.chunks_per_import_file {
                        break;
                    }
                    if taken.insert(record.chunk_id()) {
                        out.push(ExpandedRecord {
                            record: record.clone(),
                            phase: ExpansionPhase::E3,
                            score: seed.score * self.config.neighbor_decay,
                        });
                        included += 1;
                    }
                }
            }
        }
    }

    async fn file_chunks(&self, relative_path: &str) -> Option<Arc<Vec<ChunkRecord>>> {
        {
            let cache = self.file_cache.lock().await;
            if let Some(chunks) = cache.get(relative_path) {
                return Some(Arc::clone(chunks));
            }
        }
        let chunks = Arc::new(self.vectors.chunks_for_file(relative_path).await?);
        self.file_cache
            .lock()
            .await
            .insert(relative_path.to_string(), Arc::clone(&chunks));
        Some(chunks)
    }

    async fn file_imports(&self, relative_path: &str, language: Language) -> Arc<Vec<String>> {
        {
            let cache = self.import_cache.lock().await;
            if let Some(imports) = cache.get(relative_path) {
                return Arc::clone(imports);
            }
        }

        let absolute = self.root.join(relative_path);
        let specifiers = match tokio::fs::read_to_string(&absolute).await {
            Ok(content) => extract_imports(language, &content).unwrap_or_default(),
            Err(e) => {
                log::debug!("cannot read {relative_path} for import expansion: {e}");
                Vec::new()
            }
        };

        let specifiers = Arc::new(specifiers);
        self.import_cache
            .lock()
            .await
            .insert(relative_path.to_string(), Arc::clone(&specifiers));
        specifiers
    }
}

/// First `>`-separated breadcrumb component.
fn leading_scope(breadcrumb: &str) -> &str {
    breadcrumb.split('>').next().unwrap_or("").trim()
}

/// Lowercased identifier tokens of at least three characters.
fn identifier_tokens(code: &str) -> HashSet<String> {
    code.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// How many breadcrumb components appear among the seed identifiers.
fn breadcrumb_affinity(breadcrumb: &str, identifiers: &HashSet<String>) -> usize {
    breadcrumb
        .split('>')
        .map(str::trim)
        .filter(|component| !component.is_empty())
        .filter(|component| identifiers.contains(&component.to_lowercase()))
        .count()
}
