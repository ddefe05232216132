//! # Docrag Embeddings
//!
//! Embedding gateway for the document retrieval pipeline. Every vector that
//! enters or queries the index is produced here.
//!
//! ## Features
//!
//! - Asymmetric encoding: chunks as passages, search text as queries
//! - Hosted inference endpoint over HTTP, batched
//! - Local ONNX models via fastembed-rs for offline use
//! - Response validation (one non-empty vector per input, in order)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docrag_embeddings::{EmbeddingGateway, HttpEmbeddingConfig, HttpEmbeddingProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HttpEmbeddingConfig::new("https://api.pinecone.io", "secret");
//!     let gateway = EmbeddingGateway::new(Arc::new(HttpEmbeddingProvider::new(config)?));
//!     let vector = gateway.embed_query("how are chunk ids built?").await?;
//!     println!("Query vector has {} dimensions", vector.len());
//!     Ok(())
//! }
//! ```

mod error;
mod gateway;
mod http;
mod local;

pub use error::EmbeddingError;
pub use gateway::EmbeddingGateway;
pub use gateway::EmbeddingProvider;
pub use gateway::EmbeddingRole;
pub use http::HttpEmbeddingConfig;
pub use http::HttpEmbeddingProvider;
pub use local::LocalEmbeddingConfig;
pub use local::LocalEmbeddingProvider;
pub use local::LocalModelType;

/// Model used by default for both passages and queries
pub const DEFAULT_EMBEDDING_MODEL: &str = "multilingual-e5-large";

/// Output dimension of [`DEFAULT_EMBEDDING_MODEL`]
pub const DEFAULT_EMBEDDING_DIM: usize = 1024;
