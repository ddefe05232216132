use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Evaluation dataset is empty")]
    EmptyDataset,
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Model output that does not contain a usable question list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("No JSON object found in model output")]
    NoJson,

    #[error("Invalid JSON in model output: {0}")]
    InvalidJson(String),

    #[error("Model output has no \"questions\" array")]
    MissingQuestions,

    #[error("Model output contains no usable questions")]
    NoQuestions,
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion service returned no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Request(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No chunks found in the index (check the prefix or namespace)")]
    NoChunks,

    #[error("None of the {0} sampled chunks has stored text")]
    NoText(usize),

    #[error("Store error: {0}")]
    Store(#[from] docrag_vector_store::StoreError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}
