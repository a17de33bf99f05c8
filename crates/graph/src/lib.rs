//! # Weaver Graph
//!
//! Context expansion around recalled seeds.
//!
//! ## Phases
//!
//! ```text
//! Seeds
//!   ├─> E1: same-file neighbors by chunk index
//!   ├─> E2: same-file breadcrumb siblings (shared scope prefix)
//!   └─> E3: cross-file import targets (optional, off by default)
//! ```
//!
//! Expanded chunks inherit the nearest seed's score decayed by distance and
//! are deduplicated against the seeds and each other.

mod error;
mod expander;
mod imports;
mod resolvers;

pub use error::{GraphError, Result};
pub use expander::{ExpandedRecord, GraphExpander, SeedChunk};
pub use imports::extract_imports;
pub use resolvers::resolve_import;
