use crate::config::RetrieveOptions;
use crate::error::Result;
use crate::rerank::{Reranker, merge_reranked};
use crate::result::{ResultSource, Retrieval, RetrievedChunk, SearchStats};
use docrag_embeddings::EmbeddingGateway;
use docrag_vector_store::{ChunkStore, IndexMatch, VectorIndex};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

/// Two-stage retrieval: dense candidates from the index, optionally
/// refined by a reranker.
///
/// A failing rerank call never fails the retrieval; the dense order is
/// returned instead and [`SearchStats::rerank_fallback`] is set.
#[derive(Clone)]
pub struct RetrievalEngine {
    index: Arc<dyn VectorIndex>,
    gateway: EmbeddingGateway,
    reranker: Option<Arc<dyn Reranker>>,
}

impl RetrievalEngine {
    pub fn new(index: Arc<dyn VectorIndex>, gateway: EmbeddingGateway) -> Self {
        Self {
            index,
            gateway,
            reranker: None,
        }
    }

    /// Engine over the same index and gateway as `store`
    pub fn from_store(store: &ChunkStore) -> Self {
        Self::new(Arc::clone(store.index()), store.gateway().clone())
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    /// Retrieve the `top_k` chunks most relevant to `query`
    pub async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Retrieval> {
        let start = Instant::now();
        let mut stats = SearchStats::default();

        if options.top_k == 0 {
            debug!("top_k is 0, nothing to retrieve");
            return Ok(Retrieval::default());
        }

        debug!("Retrieving for: '{query}' ({options:?})");

        // Stage 0: Query embedding
        let embed_start = Instant::now();
        let vector = self.gateway.embed_query(query).await?;
        stats.embed_time_ms = embed_start.elapsed().as_millis() as u64;

        // Stage 1: Dense search
        let reranker = self.reranker.as_ref().filter(|_| options.use_rerank);
        let pool = if reranker.is_some() {
            options.first_stage_size()
        } else {
            options.top_k
        };
        let namespace = options.namespace.as_deref();

        let dense_start = Instant::now();
        let candidates = self.index.query(&vector, pool, namespace).await?;
        stats.dense_time_ms = dense_start.elapsed().as_millis() as u64;
        stats.dense_count = candidates.len();
        debug!("Dense search found {} of {pool} candidates", candidates.len());

        // Stage 2: Reranking
        let chunks = match reranker {
            Some(reranker) if !candidates.is_empty() => {
                let rerank_start = Instant::now();
                let documents: Vec<String> = candidates
                    .iter()
                    .map(|c| c.metadata.text.clone())
                    .collect();

                let chunks = match reranker.rerank(query, &documents, options.top_k).await {
                    Ok(hits) => merge_reranked(candidates, &hits, options.top_k),
                    Err(e) => {
                        warn!("Rerank failed, falling back to dense order: {e}");
                        stats.rerank_fallback = true;
                        dense_only(candidates, options.top_k)
                    }
                };
                stats.rerank_time_ms = rerank_start.elapsed().as_millis() as u64;
                chunks
            }
            _ => dense_only(candidates, options.top_k),
        };

        stats.reranked_count = chunks
            .iter()
            .filter(|c| c.source == ResultSource::Reranked)
            .count();
        stats.total_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            "Retrieval completed in {}ms, returned {} results ({} reranked)",
            stats.total_time_ms,
            chunks.len(),
            stats.reranked_count
        );

        Ok(Retrieval { chunks, stats })
    }
}

fn dense_only(candidates: Vec<IndexMatch>, top_k: usize) -> Vec<RetrievedChunk> {
    candidates
        .into_iter()
        .take(top_k)
        .map(RetrievedChunk::dense)
        .collect()
}
