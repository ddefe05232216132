use serde::{Deserialize, Serialize};

/// Hard cap on the stage-1 candidate pool when reranking
pub const MAX_RERANK_POOL: usize = 50;

/// Per-call retrieval options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveOptions {
    /// Number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Refine dense candidates with the reranker
    #[serde(default = "default_true")]
    pub use_rerank: bool,

    /// Dense candidates handed to the reranker (capped at 50)
    #[serde(default = "default_rerank_pool_size")]
    pub rerank_pool_size: usize,

    /// Index namespace, `None` for the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

fn default_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_rerank_pool_size() -> usize {
    default_pool_for(default_top_k())
}

/// Default pool for a given `top_k`: five candidates per result, capped
pub fn default_pool_for(top_k: usize) -> usize {
    MAX_RERANK_POOL.min(top_k.saturating_mul(5))
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            use_rerank: true,
            rerank_pool_size: default_rerank_pool_size(),
            namespace: None,
        }
    }
}

impl RetrieveOptions {
    /// Options for `top_k` results with the default rerank pool
    pub fn with_top_k(top_k: usize) -> Self {
        Self {
            top_k,
            rerank_pool_size: default_pool_for(top_k),
            ..Default::default()
        }
    }

    /// Dense options, no rerank pass
    pub fn dense(top_k: usize) -> Self {
        Self {
            use_rerank: false,
            ..Self::with_top_k(top_k)
        }
    }

    /// Number of stage-1 candidates to request
    pub fn first_stage_size(&self) -> usize {
        if self.use_rerank {
            self.top_k.max(MAX_RERANK_POOL.min(self.rerank_pool_size))
        } else {
            self.top_k
        }
    }
}
