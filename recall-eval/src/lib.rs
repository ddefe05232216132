/*!
# Docrag Recall Eval

Measures how well retrieval finds the chunk a question was written about.

- **Evaluation**: run labeled `{chunk_id, question}` items through the
  retrieval engine and report recall@1/3/5/10 and MRR@10
- **Question generation**: sample stored chunks and ask a generative model
  for questions answerable from each one, producing a dataset

Datasets are newline-delimited JSON, see [`dataset`].

## Example

```rust,no_run
use docrag_recall_eval::{EvalOptions, Evaluator, dataset};
use docrag_retrieval::RetrievalEngine;
use std::path::Path;

async fn run(engine: RetrievalEngine) -> anyhow::Result<()> {
    let items = dataset::read_dataset(Path::new("export/recall_questions.jsonl")).await?;
    let report = Evaluator::new(engine)
        .evaluate(&items, &EvalOptions::default())
        .await?;

    let stats = report.stats();
    println!("recall@10={} mrr@10={}", stats.recall_at_10, stats.mrr_at_10);
    Ok(())
}
```
*/

mod completion;
pub mod dataset;
mod error;
mod evaluator;
mod metrics;
mod question_gen;

pub use completion::{
    CompletionModel, DEFAULT_COMPLETION_BASE_URL, DEFAULT_COMPLETION_MODEL, HttpCompletionConfig,
    HttpCompletionModel,
};
pub use error::{CompletionError, DatasetError, EvalError, GenerationError, ParseError};
pub use evaluator::{EvalOptions, EvaluationReport, Evaluator};
pub use metrics::{
    AggregateMetrics, EvaluationItem, EvaluationResult, MISS_RANK, mrr_at, recall_at,
};
pub use question_gen::{
    GenerationOptions, GenerationReport, MAX_QUESTIONS_PER_CHUNK, MIN_QUESTIONS_PER_CHUNK,
    QuestionGenerator, clamp_questions, first_json_object, parse_questions, question_prompt,
};
