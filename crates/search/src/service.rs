use crate::cutoff::smart_top_k;
use crate::error::Result;
use crate::fusion::{fuse, FusedCandidate, RankedChunk};
use crate::packer::{pack, PackInput};
use crate::render::render_context_pack;
use crate::tokenize::{build_fts_match, tokenize_query, QueryTokens};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use weaver_embeddings::{Embedder, Reranker};
use weaver_graph::{GraphExpander, SeedChunk};
use weaver_indexer::MetadataStore;
use weaver_protocol::{
    ContextPack, ExpandedChunk, PackDebug, RecallSource, Seed, WeaverConfig,
};
use weaver_vector_store::{ChunkRecord, VectorStore};

/// The query path: recall, fusion, rerank, cutoff, expansion, packing.
///
/// Queries share only read-only index state and may run concurrently with
/// each other and with a scan.
pub struct SearchService {
    root: PathBuf,
    meta: MetadataStore,
    vectors: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    expander: GraphExpander,
    config: WeaverConfig,
}

impl SearchService {
    pub fn new(
        root: impl AsRef<Path>,
        meta: MetadataStore,
        vectors: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        config: WeaverConfig,
    ) -> Self {
        let root = root.as_ref().to_path_buf();
        let expander = GraphExpander::new(&root, Arc::clone(&vectors), config.expand.clone());
        Self {
            root,
            meta,
            vectors,
            embedder,
            reranker,
            expander,
            config,
        }
    }

    /// Build a context pack for a natural-language query.
    pub async fn build_context_pack(&self, query: &str) -> Result<ContextPack> {
        self.build_context_pack_with(query, &[], false).await
    }

    /// Build a context pack with extra technical terms and optional stage
    /// timings.
    pub async fn build_context_pack_with(
        &self,
        query: &str,
        technical_terms: &[String],
        with_debug: bool,
    ) -> Result<ContextPack> {
        let mut debug = PackDebug::default();
        let tokens = tokenize_query(query, technical_terms);
        if query.trim().is_empty() && tokens.is_empty() {
            return Ok(ContextPack::default());
        }

        let search_cfg = &self.config.search;

        // Vector recall.
        let mut vector_hits = Vec::new();
        if !query.trim().is_empty() {
            let started = Instant::now();
            let query_vectors = self.embedder.embed_batch(&[query.to_string()], None).await?;
            debug.embed_ms = started.elapsed().as_millis() as u64;

            if let Some(query_vector) = query_vectors.first() {
                let started = Instant::now();
                vector_hits = self
                    .vectors
                    .search(query_vector, search_cfg.vector_top_k, None)
                    .await?;
                debug.vector_ms = started.elapsed().as_millis() as u64;
            }
        }

        let mut records: HashMap<String, ChunkRecord> = HashMap::new();
        let vector_list: Vec<RankedChunk> = vector_hits
            .iter()
            .map(|hit| {
                let chunk_id = hit.record.chunk_id();
                records.insert(chunk_id.clone(), hit.record.clone());
                RankedChunk {
                    chunk_id,
                    relative_path: hit.record.chunk.relative_path.clone(),
                    chunk_index: hit.record.chunk.chunk_index,
                }
            })
            .collect();

        // Lexical recall.
        let started = Instant::now();
        let lexical_list = self.lexical_recall(&tokens).await;
        debug.lexical_ms = started.elapsed().as_millis() as u64;

        // Fusion.
        let fused = fuse(
            &vector_list,
            &lexical_list,
            search_cfg.rrf_k0,
            search_cfg.weight_vector,
            search_cfg.weight_lexical,
            search_cfg.fused_top_m,
        );

        // Resolve records; FTS rows from a stale file version are skipped.
        let mut candidates: Vec<(FusedCandidate, ChunkRecord)> = Vec::new();
        for candidate in fused {
            let record = match records.get(&candidate.chunk_id) {
                Some(record) => record.clone(),
                None => {
                    match self
                        .vectors
                        .get(&candidate.relative_path, candidate.chunk_index)
                        .await
                    {
                        Some(record) if record.chunk_id() == candidate.chunk_id => record,
                        _ => continue,
                    }
                }
            };
            candidates.push((candidate, record));
        }
        if candidates.is_empty() {
            return Ok(ContextPack {
                debug: with_debug.then_some(debug),
                ..Default::default()
            });
        }

        // Rerank; on failure the fusion order stands.
        let started = Instant::now();
        let rerank_scores = match &self.reranker {
            Some(reranker) => {
                let passages: Vec<String> = candidates
                    .iter()
                    .map(|(_, record)| {
                        truncate_chars(&record.chunk.display_code, search_cfg.max_rerank_chars)
                            .to_string()
                    })
                    .collect();
                match reranker
                    .rerank(query, &passages, self.config.rerank.top_n)
                    .await
                {
                    Ok(scores) if scores.len() == candidates.len() => Some(scores),
                    Ok(_) => {
                        log::warn!("reranker returned a partial score list; keeping fusion order");
                        None
                    }
                    Err(e) => {
                        log::warn!("rerank failed; keeping fusion order: {e}");
                        None
                    }
                }
            }
            None => None,
        };
        debug.rerank_ms = started.elapsed().as_millis() as u64;

        // Cutoff.
        let selected: Vec<(f32, FusedCandidate, ChunkRecord)> = match rerank_scores {
            Some(scores) => {
                let mut scored: Vec<(f32, FusedCandidate, ChunkRecord)> = scores
                    .into_iter()
                    .zip(candidates)
                    .map(|(score, (candidate, record))| (score, candidate, record))
                    .collect();
                scored.sort_by(|a, b| {
                    b.0.partial_cmp(&a.0)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id))
                });
                let score_list: Vec<f32> = scored.iter().map(|(s, _, _)| *s).collect();
                let k = smart_top_k(&score_list, search_cfg);
                scored.truncate(k);
                scored
            }
            None => candidates
                .into_iter()
                .take(search_cfg.smart_max_k)
                .map(|(candidate, record)| (candidate.score, candidate, record))
                .collect(),
        };

        let seeds: Vec<Seed> = selected
            .iter()
            .map(|(score, candidate, _)| Seed {
                relative_path: candidate.relative_path.clone(),
                chunk_index: candidate.chunk_index,
                score: *score,
                sources: recall_sources(candidate),
            })
            .collect();

        // Expansion.
        let seed_chunks: Vec<SeedChunk> = selected
            .iter()
            .map(|(score, _, record)| SeedChunk {
                record: record.clone(),
                score: *score,
            })
            .collect();
        let started = Instant::now();
        let expanded = self.expander.expand(&seed_chunks).await;
        debug.expand_ms = started.elapsed().as_millis() as u64;

        let expanded_model: Vec<ExpandedChunk> = expanded
            .iter()
            .map(|e| ExpandedChunk {
                relative_path: e.record.chunk.relative_path.clone(),
                chunk_index: e.record.chunk.chunk_index,
                phase: e.phase,
                score: e.score,
            })
            .collect();

        // Packing.
        let mut inputs: Vec<PackInput> = selected
            .iter()
            .enumerate()
            .map(|(order, (score, _, record))| PackInput {
                record: record.clone(),
                score: *score,
                is_seed: true,
                seed_order: order,
            })
            .collect();
        inputs.extend(expanded.into_iter().map(|e| PackInput {
            record: e.record,
            score: e.score,
            is_seed: false,
            seed_order: usize::MAX,
        }));

        let started = Instant::now();
        let files = pack(inputs, &self.root, &self.config.pack);
        debug.pack_ms = started.elapsed().as_millis() as u64;

        Ok(ContextPack {
            seeds,
            expanded: expanded_model,
            files,
            debug: with_debug.then_some(debug),
        })
    }

    /// Full retrieval surface: context pack rendered as a text block.
    pub async fn retrieve(
        &self,
        information_request: &str,
        technical_terms: &[String],
    ) -> Result<String> {
        let pack = self
            .build_context_pack_with(information_request, technical_terms, false)
            .await?;
        Ok(render_context_pack(&pack))
    }

    /// FTS recall with per-file and total caps applied in rank order.
    async fn lexical_recall(&self, tokens: &QueryTokens) -> Vec<RankedChunk> {
        let Some(match_expr) = build_fts_match(tokens) else {
            return Vec::new();
        };
        let fetch = self.config.search.lex_total_chunks.saturating_mul(4).max(16);
        let hits = match self.meta.fts_search(match_expr, fetch).await {
            Ok(hits) => hits,
            Err(e) => {
                log::warn!("lexical recall failed: {e}");
                return Vec::new();
            }
        };

        let per_file_cap = self.config.search.lex_chunks_per_file.max(1);
        let total_cap = self.config.search.lex_total_chunks;
        let mut per_file: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::new();

        for hit in hits {
            if out.len() >= total_cap {
                break;
            }
            let seen = per_file.entry(hit.relative_path.clone()).or_insert(0);
            if *seen >= per_file_cap {
                continue;
            }
            *seen += 1;
            out.push(RankedChunk {
                chunk_id: hit.chunk_id,
                relative_path: hit.relative_path,
                chunk_index: hit.chunk_index,
            });
        }
        out
    }
}

fn recall_sources(candidate: &FusedCandidate) -> Vec<RecallSource> {
    match (candidate.vector_rank, candidate.lexical_rank) {
        (Some(_), Some(_)) => vec![RecallSource::Fused],
        (Some(_), None) => vec![RecallSource::Vector],
        (None, Some(_)) => vec![RecallSource::Lexical],
        (None, None) => Vec::new(),
    }
}

fn truncate_chars(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        let cut = truncate_chars(text, 3);
        assert!(cut.len() <= 3);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn test_recall_source_tagging() {
        let candidate = |v: Option<usize>, l: Option<usize>| FusedCandidate {
            chunk_id: "id".to_string(),
            relative_path: "a.rs".to_string(),
            chunk_index: 0,
            score: 0.0,
            vector_rank: v,
            lexical_rank: l,
        };
        assert_eq!(
            recall_sources(&candidate(Some(1), Some(2))),
            vec![RecallSource::Fused]
        );
        assert_eq!(
            recall_sources(&candidate(Some(1), None)),
            vec![RecallSource::Vector]
        );
        assert_eq!(
            recall_sources(&candidate(None, Some(1))),
            vec![RecallSource::Lexical]
        );
    }
}
