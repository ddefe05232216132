use crate::error::EvalError;
use crate::metrics::{AggregateMetrics, EvaluationItem, EvaluationResult};
use docrag_retrieval::{RetrievalEngine, RetrieveOptions};
use futures::StreamExt;
use futures::stream;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Options for one evaluation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOptions {
    #[serde(flatten)]
    pub retrieval: RetrieveOptions,

    /// Items evaluated at once; 1 runs them strictly one after another
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            retrieval: RetrieveOptions::default(),
            concurrency: default_concurrency(),
        }
    }
}

/// Metrics plus per-item results, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub metrics: AggregateMetrics,
    pub results: Vec<EvaluationResult>,
}

impl EvaluationReport {
    /// Metrics rounded to 4 decimal places
    pub fn stats(&self) -> AggregateMetrics {
        self.metrics.rounded()
    }

    pub fn misses(&self) -> impl Iterator<Item = &EvaluationResult> {
        self.results.iter().filter(|r| !r.hit)
    }
}

/// Runs labeled questions through the retrieval engine and scores where the
/// labeled chunk landed.
pub struct Evaluator {
    engine: RetrievalEngine,
}

impl Evaluator {
    pub fn new(engine: RetrievalEngine) -> Self {
        Self { engine }
    }

    /// Evaluate every item. A failed retrieval is recorded as a miss and
    /// never aborts the run.
    pub async fn evaluate(
        &self,
        items: &[EvaluationItem],
        options: &EvalOptions,
    ) -> Result<EvaluationReport, EvalError> {
        if items.is_empty() {
            return Err(EvalError::EmptyDataset);
        }

        let start = Instant::now();
        let concurrency = options.concurrency.max(1);
        info!(
            "Evaluating {} items (top_k={}, rerank={}, concurrency={concurrency})",
            items.len(),
            options.retrieval.top_k,
            options.retrieval.use_rerank
        );

        let results: Vec<EvaluationResult> = if concurrency == 1 {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(self.evaluate_item(item, &options.retrieval).await);
            }
            results
        } else {
            stream::iter(items)
                .map(|item| self.evaluate_item(item, &options.retrieval))
                .buffered(concurrency)
                .collect()
                .await
        };

        let metrics = AggregateMetrics::compute(&results, &options.retrieval);
        info!(
            "Evaluation completed in {}ms: recall@10={:.4}, mrr@10={:.4}",
            start.elapsed().as_millis(),
            metrics.recall_at_10,
            metrics.mrr_at_10
        );

        Ok(EvaluationReport { metrics, results })
    }

    async fn evaluate_item(
        &self,
        item: &EvaluationItem,
        options: &RetrieveOptions,
    ) -> EvaluationResult {
        let retrieval = match self.engine.retrieve(&item.question, options).await {
            Ok(retrieval) => retrieval,
            Err(e) => {
                warn!("Retrieval failed for {}: {e}", item.chunk_id);
                return EvaluationResult::miss(item);
            }
        };

        match retrieval
            .chunks
            .iter()
            .position(|chunk| chunk.id.as_str() == item.chunk_id)
        {
            Some(position) => {
                let rank = position + 1;
                debug!("{} found at rank {rank}", item.chunk_id);
                EvaluationResult::found(item, rank, retrieval.chunks[position].score)
            }
            None => {
                debug!("{} not retrieved", item.chunk_id);
                EvaluationResult::miss(item)
            }
        }
    }
}
