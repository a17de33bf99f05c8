//! # Weaver Embeddings
//!
//! Typed contracts and HTTP clients for the embedding and rerank endpoints.
//!
//! The rest of the engine depends only on the [`Embedder`] and [`Reranker`]
//! traits; the HTTP implementations here add batching, adaptive rate
//! limiting and retry classification on top.
//!
//! ## Rate control
//!
//! ```text
//! 429 / "rate" 5xx
//!     │
//!     ├──> pause all submissions, wait backoff (5s → 60s, doubling)
//!     ├──> resume at concurrency 1
//!     ├──> +1 slot per 3 consecutive successes, up to the configured max
//!     └──> halve backoff after 30 consecutive successes
//! ```
//!
//! One controller per embedding configuration, injected into the client —
//! never a global.

mod client;
mod error;
mod progress;
mod rate_limit;
mod rerank;
pub mod testing;

pub use client::HttpEmbedder;
pub use error::{EmbeddingError, Result};
pub use progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
pub use rate_limit::RateController;
pub use rerank::HttpReranker;

use async_trait::async_trait;

/// Batched text-to-vector contract the engine consumes.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Width of the produced vectors.
    fn dimension(&self) -> usize;

    /// Embed `texts`, returning one vector per input in input order.
    ///
    /// Safe for concurrent callers. Progress events are emitted per API
    /// batch when a sender is supplied.
    async fn embed_batch(
        &self,
        texts: &[String],
        progress: Option<ProgressSender>,
    ) -> Result<Vec<Vec<f32>>>;
}

/// Cross-encoder rescoring contract.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score each passage against the query; higher is more relevant.
    /// Returns one score per input passage.
    async fn rerank(&self, query: &str, passages: &[String], top_n: usize) -> Result<Vec<f32>>;
}
