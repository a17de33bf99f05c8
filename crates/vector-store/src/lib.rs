//! # Weaver Vector Store
//!
//! Persistent store of chunk records and their embedding vectors.
//!
//! ## Guarantees
//!
//! - **Atomic per-file replacement**: a concurrent reader never observes a
//!   file with old and new chunk sets mixed. New rows are installed before
//!   rows of a stale file hash are dropped.
//! - **Cosine search**: vectors are normalized on write, so similarity is a
//!   dot product at query time.
//! - **Schema-versioned persistence**: a single JSON file under `vectors/`,
//!   written atomically (temp file + rename). A dimension mismatch on load
//!   surfaces as an error the indexer turns into a full rebuild.

mod error;
mod store;
mod types;

pub use error::{Result, VectorStoreError};
pub use store::VectorStore;
pub use types::{normalize_in_place, ChunkRecord, VectorHit};

// Re-export chunk types for convenience
pub use weaver_code_chunker::{ByteSpan, Chunk};
