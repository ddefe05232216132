use docrag_retrieval::RetrieveOptions;
use serde::{Deserialize, Serialize};

/// Rank recorded for an item whose chunk was not retrieved
pub const MISS_RANK: i64 = -1;

/// A labeled question: `question` should retrieve `chunk_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationItem {
    pub chunk_id: String,
    pub question: String,
}

impl EvaluationItem {
    pub fn new(chunk_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            question: question.into(),
        }
    }
}

/// Outcome of one evaluation item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub chunk_id: String,
    pub question: String,
    pub hit: bool,

    /// 1-based rank of the labeled chunk, [`MISS_RANK`] when absent
    pub rank: i64,

    /// Score of the labeled chunk when it was retrieved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl EvaluationResult {
    pub fn found(item: &EvaluationItem, rank: usize, score: f32) -> Self {
        Self {
            chunk_id: item.chunk_id.clone(),
            question: item.question.clone(),
            hit: true,
            rank: i64::try_from(rank).unwrap_or(i64::MAX),
            score: Some(score),
        }
    }

    pub fn miss(item: &EvaluationItem) -> Self {
        Self {
            chunk_id: item.chunk_id.clone(),
            question: item.question.clone(),
            hit: false,
            rank: MISS_RANK,
            score: None,
        }
    }

    /// Rank when the chunk was found within the first `k` results
    fn rank_within(&self, k: i64) -> Option<i64> {
        (1..=k).contains(&self.rank).then_some(self.rank)
    }
}

/// Recall and MRR over one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub size: usize,
    pub top_k: usize,
    pub use_rerank: bool,
    pub rerank_pool_size: usize,
    pub recall_at_1: f64,
    pub recall_at_3: f64,
    pub recall_at_5: f64,
    pub recall_at_10: f64,
    pub mrr_at_10: f64,
}

impl AggregateMetrics {
    /// Compute metrics over `results`. Every metric is 0 for an empty run.
    pub fn compute(results: &[EvaluationResult], options: &RetrieveOptions) -> Self {
        Self {
            size: results.len(),
            top_k: options.top_k,
            use_rerank: options.use_rerank,
            rerank_pool_size: options.rerank_pool_size,
            recall_at_1: recall_at(results, 1),
            recall_at_3: recall_at(results, 3),
            recall_at_5: recall_at(results, 5),
            recall_at_10: recall_at(results, 10),
            mrr_at_10: mrr_at(results, 10),
        }
    }

    /// The same metrics rounded to 4 decimal places, as reported
    pub fn rounded(&self) -> Self {
        Self {
            recall_at_1: round4(self.recall_at_1),
            recall_at_3: round4(self.recall_at_3),
            recall_at_5: round4(self.recall_at_5),
            recall_at_10: round4(self.recall_at_10),
            mrr_at_10: round4(self.mrr_at_10),
            ..self.clone()
        }
    }
}

/// Fraction of results ranked within the first `k`
pub fn recall_at(results: &[EvaluationResult], k: i64) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let hits = results.iter().filter_map(|r| r.rank_within(k)).count();
    hits as f64 / results.len() as f64
}

/// Mean reciprocal rank, counting only ranks within the first `k`
pub fn mrr_at(results: &[EvaluationResult], k: i64) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let sum: f64 = results
        .iter()
        .filter_map(|r| r.rank_within(k))
        .map(|rank| 1.0 / rank as f64)
        .sum();
    sum / results.len() as f64
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
