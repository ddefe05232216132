use async_trait::async_trait;
use docrag_embeddings::EmbeddingError;
use docrag_embeddings::EmbeddingGateway;
use docrag_embeddings::EmbeddingProvider;
use docrag_embeddings::EmbeddingRole;
use docrag_recall_eval::EvalError;
use docrag_recall_eval::EvalOptions;
use docrag_recall_eval::EvaluationItem;
use docrag_recall_eval::Evaluator;
use docrag_recall_eval::MISS_RANK;
use docrag_retrieval::RetrievalEngine;
use docrag_retrieval::RetrieveOptions;
use docrag_vector_store::ChunkId;
use docrag_vector_store::ChunkRecord;
use docrag_vector_store::ChunkStore;
use docrag_vector_store::ChunkStoreConfig;
use docrag_vector_store::IdPage;
use docrag_vector_store::IndexError;
use docrag_vector_store::IndexMatch;
use docrag_vector_store::LocalIndex;
use docrag_vector_store::LocalIndexConfig;
use docrag_vector_store::VectorIndex;
use docrag_vector_store::document_fingerprint;
use pretty_assertions::assert_eq;
use std::sync::Arc;

const CHUNKS: [&str; 3] = [
    "apple pie needs butter and flour",
    "banana bread bakes for an hour",
    "carrot soup is served hot",
];

/// One axis per keyword, so a question lands on the chunk sharing its keyword.
/// Texts mentioning "broken" get a negative axis that [`FlakyIndex`] rejects.
struct KeywordProvider;

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    fn model(&self) -> &str {
        "keyword"
    }

    async fn embed(
        &self,
        texts: &[String],
        _role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                if text.contains("broken") {
                    vec![-1.0, 0.0, 0.0, 0.0]
                } else if text.contains("apple") {
                    vec![1.0, 0.0, 0.0, 0.0]
                } else if text.contains("banana") {
                    vec![0.0, 1.0, 0.0, 0.0]
                } else if text.contains("carrot") {
                    vec![0.0, 0.0, 1.0, 0.0]
                } else {
                    vec![0.0, 0.0, 0.0, 1.0]
                }
            })
            .collect())
    }
}

/// Local index whose queries fail for negative vectors.
struct FlakyIndex {
    inner: LocalIndex,
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn upsert(&self, records: Vec<ChunkRecord>, ns: Option<&str>) -> Result<(), IndexError> {
        self.inner.upsert(records, ns).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        ns: Option<&str>,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        if vector.iter().any(|v| *v < 0.0) {
            return Err(IndexError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.inner.query(vector, top_k, ns).await
    }

    async fn list_ids_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
        ns: Option<&str>,
    ) -> Result<IdPage, IndexError> {
        self.inner.list_ids_page(prefix, cursor, ns).await
    }

    async fn fetch(&self, ids: &[ChunkId], ns: Option<&str>) -> Result<Vec<ChunkRecord>, IndexError> {
        self.inner.fetch(ids, ns).await
    }

    async fn delete(&self, ids: &[ChunkId], ns: Option<&str>) -> Result<(), IndexError> {
        self.inner.delete(ids, ns).await
    }
}

async fn seeded_engine() -> anyhow::Result<(RetrievalEngine, Vec<String>)> {
    let index = FlakyIndex {
        inner: LocalIndex::in_memory(LocalIndexConfig::default())?,
    };
    let store = ChunkStore::new(
        Arc::new(index),
        EmbeddingGateway::new(Arc::new(KeywordProvider)),
        ChunkStoreConfig::default(),
    )?;

    let fingerprint = document_fingerprint("kitchen.md");
    let chunks: Vec<String> = CHUNKS.iter().map(ToString::to_string).collect();
    store.upsert(&fingerprint, "kitchen.md", &chunks).await?;

    let ids = CHUNKS
        .iter()
        .map(|c| ChunkId::new(&fingerprint, c).into_string())
        .collect();
    Ok((RetrievalEngine::from_store(&store), ids))
}

fn dense_options(top_k: usize, concurrency: usize) -> EvalOptions {
    EvalOptions {
        retrieval: RetrieveOptions::dense(top_k),
        concurrency,
    }
}

#[test_log::test(tokio::test)]
async fn test_end_to_end_recall() -> anyhow::Result<()> {
    let (engine, ids) = seeded_engine().await?;
    let items = vec![
        EvaluationItem::new(&ids[0], "what goes into apple pie?"),
        EvaluationItem::new(&ids[1], "how long does banana bread bake?"),
        EvaluationItem::new(&ids[2], "how is carrot soup served?"),
        EvaluationItem::new("missing#chunk", "how is carrot soup served?"),
    ];

    let report = Evaluator::new(engine)
        .evaluate(&items, &dense_options(10, 1))
        .await?;

    let ranks: Vec<i64> = report.results.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 1, 1, MISS_RANK]);

    let stats = report.stats();
    assert_eq!(stats.size, 4);
    assert_eq!(stats.recall_at_1, 0.75);
    assert_eq!(stats.recall_at_10, 0.75);
    assert_eq!(stats.mrr_at_10, 0.75);
    assert_eq!(report.misses().count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_retrieval_is_a_miss() -> anyhow::Result<()> {
    let (engine, ids) = seeded_engine().await?;
    let items = vec![
        EvaluationItem::new(&ids[0], "apple pie?"),
        EvaluationItem::new(&ids[1], "this question is broken"),
    ];

    let report = Evaluator::new(engine)
        .evaluate(&items, &dense_options(3, 1))
        .await?;

    assert!(report.results[0].hit);
    assert!(!report.results[1].hit);
    assert_eq!(report.results[1].rank, MISS_RANK);
    assert_eq!(report.results[1].score, None);
    assert_eq!(report.stats().recall_at_3, 0.5);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_run_keeps_input_order() -> anyhow::Result<()> {
    let (engine, ids) = seeded_engine().await?;
    let items = vec![
        EvaluationItem::new(&ids[2], "carrot?"),
        EvaluationItem::new(&ids[0], "broken apple"),
        EvaluationItem::new(&ids[1], "banana?"),
        EvaluationItem::new(&ids[0], "apple?"),
    ];

    let evaluator = Evaluator::new(engine);
    let sequential = evaluator.evaluate(&items, &dense_options(3, 1)).await?;
    let concurrent = evaluator.evaluate(&items, &dense_options(3, 4)).await?;

    assert_eq!(concurrent, sequential);
    let questions: Vec<&str> = concurrent
        .results
        .iter()
        .map(|r| r.question.as_str())
        .collect();
    assert_eq!(questions, vec!["carrot?", "broken apple", "banana?", "apple?"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_dataset_is_rejected() -> anyhow::Result<()> {
    let (engine, _) = seeded_engine().await?;

    let err = Evaluator::new(engine)
        .evaluate(&[], &EvalOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EvalError::EmptyDataset));
    Ok(())
}

#[tokio::test]
async fn test_metrics_record_run_options() -> anyhow::Result<()> {
    let (engine, ids) = seeded_engine().await?;
    let items = vec![EvaluationItem::new(&ids[0], "apple?")];
    let options = EvalOptions {
        retrieval: RetrieveOptions::with_top_k(4),
        concurrency: 1,
    };

    let report = Evaluator::new(engine).evaluate(&items, &options).await?;

    assert_eq!(report.metrics.top_k, 4);
    assert!(report.metrics.use_rerank);
    assert_eq!(report.metrics.rerank_pool_size, 20);
    assert!(report.results[0].hit);
    Ok(())
}
