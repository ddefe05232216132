/*!
# Docrag Retrieval

Two-stage retrieval over the chunk index:

- **Dense search** via query embeddings and vector similarity
- **Reranking** of the dense candidates by a cross-encoder service
- **Fallback merge**: reranked hits first, dense backfill, dense order when
  the reranker fails

## Architecture

```text
Query
  └─> Embedding (query role)
        └─> Dense search (N candidates)
              └─> Rerank (top_k) ──fails──> dense order
                    └─> Merge + backfill
                          └─> Final ranked results
```

`N` is `max(top_k, min(50, rerank_pool_size))` when reranking and `top_k`
otherwise.

## Example

```rust,no_run
use docrag_retrieval::{HttpReranker, HttpRerankerConfig, RetrievalEngine, RetrieveOptions};
use docrag_vector_store::ChunkStore;
use std::sync::Arc;

async fn search(store: &ChunkStore) -> anyhow::Result<()> {
    let reranker = HttpReranker::new(HttpRerankerConfig::new("https://api.pinecone.io", "secret"))?;
    let engine = RetrievalEngine::from_store(store).with_reranker(Arc::new(reranker));

    let retrieval = engine
        .retrieve("how are documents deleted?", &RetrieveOptions::with_top_k(5))
        .await?;

    for (i, chunk) in retrieval.chunks.iter().enumerate() {
        println!("{}. {} (score: {:.2})", i + 1, chunk.id, chunk.score);
    }
    Ok(())
}
```
*/

mod config;
mod engine;
mod error;
mod rerank;
mod result;

pub use config::{MAX_RERANK_POOL, RetrieveOptions, default_pool_for};
pub use engine::RetrievalEngine;
pub use error::{RerankError, Result, RetrievalError};
pub use rerank::{
    DEFAULT_RERANK_MODEL, HttpReranker, HttpRerankerConfig, RerankHit, Reranker, merge_reranked,
};
pub use result::{ResultSource, Retrieval, RetrievedChunk, SearchStats};
