use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] weaver_vector_store::VectorStoreError),

    #[error("Index error: {0}")]
    IndexerError(#[from] weaver_indexer::IndexerError),

    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] weaver_embeddings::EmbeddingError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
