use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] weaver_code_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] weaver_vector_store::VectorStoreError),

    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] weaver_embeddings::EmbeddingError),

    #[error("Metadata store error: {0}")]
    StoreError(String),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for IndexerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreError(e.to_string())
    }
}
