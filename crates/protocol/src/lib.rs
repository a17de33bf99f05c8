//! # Weaver Protocol
//!
//! Shared data model and configuration for the ContextWeaver retrieval
//! pipeline.
//!
//! Everything that crosses a crate boundary lives here: the configuration
//! tree consumed by the indexer and search layers, the `ContextPack` output
//! model, repository exclude-pattern matching, and the project identity that
//! anchors persistent state on disk.

pub mod config;
pub mod pack;
pub mod path_filters;
pub mod project;

pub use config::{
    EmbeddingConfig, ExpandConfig, IndexConfig, PackConfig, RerankConfig, SearchConfig,
    WeaverConfig,
};
pub use pack::{
    ContextPack, ExpandedChunk, ExpansionPhase, FileSegments, PackDebug, RecallSource, Seed,
    Segment,
};
pub use path_filters::ExcludeFilter;
pub use project::{project_id, project_state_dir, ProjectId};
