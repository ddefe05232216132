use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] docrag_embeddings::EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] docrag_vector_store::IndexError),
}

/// Failure of the rerank pass. Never surfaces from a retrieval: the engine
/// falls back to dense order instead.
#[derive(Error, Debug)]
pub enum RerankError {
    #[error("Rerank request failed: {0}")]
    Request(String),

    #[error("Rerank service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid rerank response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RerankError {
    fn from(err: reqwest::Error) -> Self {
        RerankError::Request(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
