//! # Weaver Search
//!
//! The query path of the retrieval engine.
//!
//! ```text
//! Query
//!   ├─> embed once
//!   ├─> vector recall ‖ lexical recall (chunk FTS)
//!   ├─> Reciprocal Rank Fusion
//!   ├─> cross-encoder rerank (falls back to fusion order)
//!   ├─> Smart-TopK cutoff (floor + dynamic threshold + delta guard)
//!   ├─> graph expansion (E1 / E2 / E3)
//!   └─> context packing under the character budget
//! ```

mod cutoff;
mod error;
mod fusion;
mod packer;
mod render;
mod service;
mod tokenize;

pub use cutoff::smart_top_k;
pub use error::{Result, SearchError};
pub use fusion::{fuse, FusedCandidate, RankedChunk};
pub use packer::{estimate_tokens, pack, PackInput};
pub use render::render_context_pack;
pub use service::SearchService;
pub use tokenize::{build_fts_match, tokenize_query, QueryTokens};

// Re-export the output model for convenience
pub use weaver_protocol::{ContextPack, FileSegments, Seed, Segment};
