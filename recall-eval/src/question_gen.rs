use crate::completion::CompletionModel;
use crate::dataset::append_items;
use crate::error::{GenerationError, ParseError};
use crate::metrics::EvaluationItem;
use docrag_vector_store::{ChunkStore, StoredChunk};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Fewest questions requested per chunk
pub const MIN_QUESTIONS_PER_CHUNK: usize = 2;

/// Most questions requested per chunk
pub const MAX_QUESTIONS_PER_CHUNK: usize = 5;

/// Keep the per-chunk question count within the supported range
pub fn clamp_questions(requested: usize) -> usize {
    requested.clamp(MIN_QUESTIONS_PER_CHUNK, MAX_QUESTIONS_PER_CHUNK)
}

/// Prompt asking for `count` questions answerable from `context` alone
pub fn question_prompt(context: &str, count: usize) -> String {
    let count = clamp_questions(count);
    format!(
        "You are a teacher writing an exam. Ask questions based only on the fragment below, \
not on your own knowledge or any outside source.\n\
Write {count} high-quality questions about the fragment, each covering a different aspect of it. \
Every question must be clearly worded, closely tied to the fragment and answerable from it.\n\
\n\
Reply with a single JSON object whose key is \"questions\" and whose value is an array of strings, \
for example: {{\"questions\": [\"Question 1\", \"Question 2\"]}}\n\
Output nothing but that JSON: no comments, explanations or extra text.\n\
\n\
Fragment:\n\"\"\"\n{context}\n\"\"\""
    )
}

/// Extract at most `limit` questions from model output.
///
/// The whole output is decoded as JSON first; when that fails, the first
/// balanced `{...}` fragment is decoded instead.
pub fn parse_questions(output: &str, limit: usize) -> Result<Vec<String>, ParseError> {
    let trimmed = output.trim();
    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => {
            let fragment = first_json_object(trimmed).ok_or(ParseError::NoJson)?;
            serde_json::from_str(fragment).map_err(|e| ParseError::InvalidJson(e.to_string()))?
        }
    };

    let questions = value
        .get("questions")
        .and_then(Value::as_array)
        .ok_or(ParseError::MissingQuestions)?;

    let questions: Vec<String> = questions
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect();

    if questions.is_empty() {
        return Err(ParseError::NoQuestions);
    }
    Ok(questions)
}

/// The first balanced `{...}` in `text`, ignoring braces inside strings
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Options for one question-generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Number of chunks to sample from the index
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Questions per chunk, clamped to 2..=5
    #[serde(default = "default_questions_per_chunk")]
    pub questions_per_chunk: usize,

    /// Only sample ids with this prefix (e.g. one document)
    #[serde(default)]
    pub prefix: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    /// Append each chunk's questions here as soon as they are generated
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_sample_size() -> usize {
    70
}

fn default_questions_per_chunk() -> usize {
    2
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            questions_per_chunk: default_questions_per_chunk(),
            prefix: None,
            namespace: None,
            output: None,
        }
    }
}

/// Outcome of a generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub items: Vec<EvaluationItem>,

    /// Chunks with text that were sent to the model
    pub chunks_sampled: usize,

    /// Chunks that produced no questions
    pub chunks_skipped: usize,
}

/// Builds evaluation datasets by asking a generative model for questions
/// about chunks sampled from the index.
pub struct QuestionGenerator {
    store: ChunkStore,
    model: Arc<dyn CompletionModel>,
}

impl QuestionGenerator {
    pub fn new(store: ChunkStore, model: Arc<dyn CompletionModel>) -> Self {
        Self { store, model }
    }

    pub async fn generate(
        &self,
        options: &GenerationOptions,
    ) -> Result<GenerationReport, GenerationError> {
        let per_chunk = clamp_questions(options.questions_per_chunk);
        let store = self.store.with_namespace(options.namespace.clone());

        info!(
            "Sampling up to {} chunks{}",
            options.sample_size,
            options
                .prefix
                .as_deref()
                .map(|p| format!(" with prefix '{p}'"))
                .unwrap_or_default()
        );

        let ids = store
            .list_ids(options.prefix.as_deref(), options.sample_size)
            .await?;
        if ids.is_empty() {
            return Err(GenerationError::NoChunks);
        }

        let chunks = store.fetch_chunks(&ids).await?;
        if chunks.is_empty() {
            return Err(GenerationError::NoText(ids.len()));
        }

        let mut report = GenerationReport {
            chunks_sampled: chunks.len(),
            ..Default::default()
        };

        for chunk in &chunks {
            let questions = match self.questions_for(chunk, per_chunk).await {
                Ok(questions) => questions,
                Err(reason) => {
                    warn!("Skipping chunk {}: {reason}", chunk.id);
                    report.chunks_skipped += 1;
                    continue;
                }
            };

            let items: Vec<EvaluationItem> = questions
                .into_iter()
                .map(|q| EvaluationItem::new(chunk.id.as_str(), q))
                .collect();
            if let Some(path) = &options.output {
                append_items(path, &items).await?;
            }
            debug!("{} questions for {}", items.len(), chunk.id);
            report.items.extend(items);
        }

        info!(
            "Generated {} questions from {} chunks ({} skipped)",
            report.items.len(),
            report.chunks_sampled,
            report.chunks_skipped
        );
        Ok(report)
    }

    async fn questions_for(&self, chunk: &StoredChunk, count: usize) -> Result<Vec<String>, String> {
        let prompt = question_prompt(chunk.text(), count);
        let output = self
            .model
            .complete(&prompt)
            .await
            .map_err(|e| e.to_string())?;
        parse_questions(&output, count).map_err(|e| e.to_string())
    }
}
