use docrag_vector_store::{ChunkId, ChunkMetadata, IndexMatch};
use serde::{Deserialize, Serialize};

/// Which stage placed a result in the final list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Dense similarity order (no rerank, fallback, or backfill)
    Dense,
    /// Placed by the reranker
    Reranked,
}

/// A single retrieved chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: ChunkId,

    /// Rerank relevance for reranked entries, dense similarity otherwise
    pub score: f32,

    pub metadata: ChunkMetadata,

    pub source: ResultSource,
}

impl RetrievedChunk {
    pub fn dense(candidate: IndexMatch) -> Self {
        Self {
            id: candidate.id,
            score: candidate.score,
            metadata: candidate.metadata,
            source: ResultSource::Dense,
        }
    }

    pub fn reranked(candidate: &IndexMatch, score: f32) -> Self {
        Self {
            id: candidate.id.clone(),
            score,
            metadata: candidate.metadata.clone(),
            source: ResultSource::Reranked,
        }
    }

    pub fn text(&self) -> &str {
        &self.metadata.text
    }
}

/// Search performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Query embedding time in milliseconds
    pub embed_time_ms: u64,

    /// Dense search time in milliseconds
    pub dense_time_ms: u64,

    /// Reranking time in milliseconds
    pub rerank_time_ms: u64,

    /// Total retrieval time in milliseconds
    pub total_time_ms: u64,

    /// Number of stage-1 candidates
    pub dense_count: usize,

    /// Number of results placed by the reranker
    pub reranked_count: usize,

    /// The rerank call failed and dense order was used
    pub rerank_fallback: bool,
}

/// Ordered results of one retrieval (rank = position + 1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    pub chunks: Vec<RetrievedChunk>,
    pub stats: SearchStats,
}

impl Retrieval {
    /// 1-based rank of `id`, if present
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.chunks
            .iter()
            .position(|chunk| chunk.id.as_str() == id)
            .map(|pos| pos + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }
}
