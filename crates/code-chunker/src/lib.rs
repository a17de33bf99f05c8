//! # Weaver Code Chunker
//!
//! Syntax-tree driven semantic splitter emitting dual-text chunks.
//!
//! ## Pipeline
//!
//! ```text
//! Source file
//!     │
//!     ├──> Language detection (from extension)
//!     │
//!     ├──> Tree-sitter parse (pooled parsers)
//!     │    ├─> One chunk per chunkable node (function, class, ...)
//!     │    ├─> Breadcrumb from enclosing context nodes
//!     │    └─> Gap-aware coverage of unclaimed regions
//!     │
//!     ├──> Oversize split (syntactic boundaries, then lines)
//!     │
//!     └──> Chunk[] with display/vector dual text
//! ```
//!
//! Unsupported or unparseable files go through the line-based fallback
//! splitter instead, so every readable file yields a deterministic chunk
//! sequence.
//!
//! ## Example
//!
//! ```rust
//! use weaver_code_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let chunks = chunker.chunk_file("demo.rs", "fn answer() -> u32 { 42 }", "abc123");
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].chunk_id(), "demo.rs#abc123#0");
//! ```

mod chunker;
mod error;
mod fallback;
mod language;
pub mod parser_pool;
mod splitter;
mod types;

pub use chunker::{Chunker, ChunkerConfig};
pub use error::{ChunkerError, Result};
pub use language::{Language, LanguageSpec};
pub use types::{ByteSpan, Chunk};
