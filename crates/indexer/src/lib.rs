//! # Weaver Indexer
//!
//! Scan orchestration for the retrieval index.
//!
//! ## Pipeline
//!
//! ```text
//! Repository
//!     │
//!     ├──> Scanner (exclude patterns, no symlink escape)
//!     │      └─> hash + classify: added / modified / unchanged / deleted
//!     │
//!     ├──> Chunker (bounded blocking pool)
//!     │
//!     ├──> Embedder (one batch per scan, rate controlled)
//!     │
//!     └──> Stores
//!            ├─> vector store: atomic per-file replacement
//!            ├─> chunk FTS: delete + insert (non-fatal on failure)
//!            └─> file table: vector_index_hash tracks convergence
//! ```
//!
//! A file whose `vector_index_hash` differs from its `content_hash` is dirty
//! and gets re-embedded on the next scan, which makes crashes between the
//! vector write and the metadata update self-heal.

mod error;
mod index_lock;
mod indexer;
mod metadata;
mod scanner;
mod stats;

pub use error::{IndexerError, Result};
pub use indexer::{IndexStatus, Indexer, ScanOptions};
pub use metadata::{FileRecord, FtsHit, FtsRow, MetadataStore};
pub use scanner::{ScannedFile, Scanner};
pub use stats::{ScanStats, VectorIndexStats};
