//! # Docrag Vector Store
//!
//! Content-addressed chunk storage on top of a vector index.
//!
//! ## Features
//!
//! - Stable chunk ids: `{document fingerprint}#{content fingerprint}`
//! - Idempotent upserts, document-scoped deletion by id prefix
//! - Paginated id listing and metadata fetch
//! - Local JSON-file index and a hosted REST index behind one trait
//! - A small registry of uploaded documents
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use docrag_embeddings::{EmbeddingGateway, LocalEmbeddingConfig, LocalEmbeddingProvider};
//! use docrag_vector_store::{ChunkStore, ChunkStoreConfig, LocalIndex, LocalIndexConfig};
//! use docrag_vector_store::document_fingerprint;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = LocalEmbeddingProvider::new(LocalEmbeddingConfig::default())?;
//!     let index = LocalIndex::open(Path::new(".docrag/index.json"), LocalIndexConfig::default()).await?;
//!     let store = ChunkStore::new(
//!         Arc::new(index),
//!         EmbeddingGateway::new(Arc::new(provider)),
//!         ChunkStoreConfig::default(),
//!     )?;
//!
//!     let fingerprint = document_fingerprint("handbook.md");
//!     let chunks = vec!["First paragraph.".to_string(), "Second paragraph.".to_string()];
//!     let written = store.upsert(&fingerprint, "handbook.md", &chunks).await?;
//!     println!("Stored {written} chunks");
//!     Ok(())
//! }
//! ```

mod chunk;
mod error;
mod http;
mod identity;
mod index;
mod local;
mod registry;
mod store;

pub use chunk::{ChunkMetadata, ChunkRecord, IdPage, IndexMatch, StoredChunk};
pub use error::{ChunkIdError, IndexError, RegistryError, StoreError};
pub use http::{HttpIndex, HttpIndexConfig};
pub use identity::{ChunkId, document_fingerprint, document_prefix, fingerprint};
pub use index::VectorIndex;
pub use local::{LocalIndex, LocalIndexConfig};
pub use registry::{DocumentEntry, DocumentRegistry, FileRegistry};
pub use store::{ChunkStore, ChunkStoreConfig};
