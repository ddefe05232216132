use thiserror::Error;

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Failed to initialize the embedding model
    #[error("Failed to initialize embedding model: {0}")]
    ModelInitialization(String),

    /// Failed to generate embeddings
    #[error("Failed to generate embeddings: {0}")]
    EmbeddingGeneration(String),

    /// The embedding service could not be reached
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The embedding service answered with a non-success status
    #[error("Embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The embedding service returned no vectors (or an empty vector)
    #[error("Embedding service returned no data")]
    EmptyResponse,

    /// The number of vectors does not match the number of inputs
    #[error("Embedding count mismatch: expected {expected}, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    /// Invalid input provided to embedding service
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<fastembed::Error> for EmbeddingError {
    fn from(err: fastembed::Error) -> Self {
        EmbeddingError::EmbeddingGeneration(err.to_string())
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Request(err.to_string())
    }
}
