use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Failures of the embedding and rerank clients.
///
/// Rate limiting never surfaces here — it is retried indefinitely behind the
/// controller. Network errors surface only after the retry budget is spent.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Network error after retries: {0}")]
    Network(String),

    #[error("Embedding endpoint rejected the request: {0}")]
    Endpoint(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Rerank endpoint error: {0}")]
    Rerank(String),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl EmbeddingError {
    /// Permanent failures fail the batch; everything else was retried
    /// internally before surfacing.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Endpoint(_) | Self::Dimension { .. } | Self::Http(_)
        )
    }
}
