use thiserror::Error;

/// Errors raised by a [`crate::VectorIndex`] backend
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index service could not be reached
    #[error("Index request failed: {0}")]
    Request(String),

    /// The index service answered with a non-success status
    #[error("Index service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The index service answered with a body we could not interpret
    #[error("Invalid index response: {0}")]
    InvalidResponse(String),

    /// Backend configuration that cannot work
    #[error("Invalid index configuration: {0}")]
    InvalidConfig(String),

    /// A pagination cursor that this backend did not issue
    #[error("Invalid pagination cursor: {0}")]
    InvalidCursor(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        IndexError::Request(err.to_string())
    }
}

/// Errors raised by [`crate::ChunkStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] docrag_embeddings::EmbeddingError),

    /// Index error
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    /// Invalid input provided to the store
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A string that is not a `{document}#{content}` chunk identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid chunk id: {0:?}")]
pub struct ChunkIdError(pub String);

/// Errors raised by a [`crate::DocumentRegistry`]
#[derive(Debug, Error)]
pub enum RegistryError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
