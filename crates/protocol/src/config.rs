use serde::{Deserialize, Serialize};

/// Top-level configuration for the retrieval engine.
///
/// Callers build this from whatever front-end they have (environment, CLI
/// flags, config files); the core only consumes the resolved values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaverConfig {
    pub embedding: EmbeddingConfig,
    pub rerank: RerankConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub expand: ExpandConfig,
    pub pack: PackConfig,
}

/// Embedding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding endpoint (`{base}/embeddings`).
    pub base_url: String,

    /// Bearer token sent with every request.
    pub api_key: String,

    /// Model identifier passed through to the endpoint.
    pub model: String,

    /// Vector width `D`. Changing this triggers a full reindex.
    pub dimensions: usize,

    /// Upper bound on concurrent embedding requests.
    pub max_concurrency: usize,

    /// Texts per API request.
    pub batch_size: usize,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1024,
            max_concurrency: 10,
            batch_size: 32,
            timeout_secs: 90,
        }
    }
}

/// Reranker endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,

    /// Requested top-N from the reranker.
    pub top_n: usize,

    pub timeout_secs: u64,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            model: String::new(),
            top_n: 20,
            timeout_secs: 90,
        }
    }
}

/// Indexing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// User exclude patterns appended to the built-in baseline.
    pub ignore_patterns: Vec<String>,

    /// Files chunked concurrently during a scan.
    pub chunk_parallelism: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            chunk_parallelism: 8,
        }
    }
}

/// Recall, fusion and cutoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Vector recall depth.
    pub vector_top_k: usize,

    /// Best-scoring lexical chunks kept per file.
    pub lex_chunks_per_file: usize,

    /// Total lexical chunks kept.
    pub lex_total_chunks: usize,

    /// Candidates surviving fusion.
    pub fused_top_m: usize,

    /// RRF rank smoothing constant.
    pub rrf_k0: f32,

    /// RRF weight of the vector list.
    pub weight_vector: f32,

    /// RRF weight of the lexical list.
    pub weight_lexical: f32,

    /// Passage truncation for reranking.
    pub max_rerank_chars: usize,

    /// Dynamic threshold as a fraction of the best score.
    pub smart_top_score_ratio: f32,

    /// Absolute score floor.
    pub smart_min_score: f32,

    /// Safe-harbor size: chunks admitted on the floor alone.
    pub smart_min_k: usize,

    /// Hard cap on the seed set.
    pub smart_max_k: usize,

    /// Outlier detection: if `s2 < s1 * ratio`, the threshold is recomputed
    /// from `s2`.
    pub delta_guard_ratio: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 50,
            lex_chunks_per_file: 3,
            lex_total_chunks: 30,
            fused_top_m: 30,
            rrf_k0: 60.0,
            weight_vector: 1.0,
            weight_lexical: 0.5,
            max_rerank_chars: 2048,
            smart_top_score_ratio: 0.5,
            smart_min_score: 0.25,
            smart_min_k: 2,
            smart_max_k: 15,
            delta_guard_ratio: 0.4,
        }
    }
}

/// Graph expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandConfig {
    /// Chunks included before and after each seed (E1).
    pub neighbor_hops: usize,

    /// Breadcrumb siblings included per seed (E2).
    pub breadcrumb_expand_limit: usize,

    /// Import targets resolved per seed (E3). Zero disables the phase.
    pub import_files_per_seed: usize,

    /// Chunks included per resolved import file.
    pub chunks_per_import_file: usize,

    /// Score decay applied per hop of distance from the seed.
    pub neighbor_decay: f32,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            neighbor_hops: 1,
            breadcrumb_expand_limit: 2,
            import_files_per_seed: 0,
            chunks_per_import_file: 2,
            neighbor_decay: 0.8,
        }
    }
}

/// Context packing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Token estimate per character.
    pub tokens_per_char: f32,

    /// Character budget for the whole pack.
    pub max_total_chars: usize,

    /// Segment cap per file.
    pub max_segments_per_file: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            tokens_per_char: 0.28,
            max_total_chars: 48_000,
            max_segments_per_file: 3,
        }
    }
}
