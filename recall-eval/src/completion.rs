use crate::error::CompletionError;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default generative model for question generation
pub const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.5-flash";

/// Default base URL of the generative language API
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A text-in, text-out generative model
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Configuration for the hosted completion model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent in the `x-goog-api-key` header
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_COMPLETION_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_COMPLETION_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl HttpCompletionConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            api_key: api_key.into(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Completion model backed by the `generateContent` REST endpoint.
pub struct HttpCompletionModel {
    http: reqwest::Client,
    config: HttpCompletionConfig,
}

impl HttpCompletionModel {
    pub fn new(config: HttpCompletionConfig) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| CompletionError::Request(format!("invalid api key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpCompletionConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionModel for HttpCompletionModel {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("POST {}:generateContent", self.config.model);
        let resp = self.http.post(url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let body: GenerateResponse = resp.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CompletionError::EmptyResponse);
        }
        Ok(text)
    }
}
