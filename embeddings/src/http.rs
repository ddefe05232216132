use crate::error::EmbeddingError;
use crate::gateway::{EmbeddingProvider, EmbeddingRole};
use crate::DEFAULT_EMBEDDING_MODEL;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const API_VERSION: &str = "2025-04";

/// Configuration for the hosted embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpEmbeddingConfig {
    /// Base URL of the inference API (e.g. `https://api.pinecone.io`)
    pub base_url: String,

    /// API key sent in the `Api-Key` header
    pub api_key: String,

    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum number of inputs per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_batch_size() -> usize {
    96
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl HttpEmbeddingConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: default_model(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Serialize)]
struct EmbedParameters {
    input_type: EmbeddingRole,
    truncate: &'static str,
}

#[derive(Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbedData>,
}

/// One entry of the response. Sparse entries carry no dense `values`, which
/// the gateway reports as an empty response.
#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    values: Vec<f32>,
}

/// Embedding provider backed by a hosted inference endpoint.
pub struct HttpEmbeddingProvider {
    http: reqwest::Client,
    config: HttpEmbeddingConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.batch_size == 0 {
            return Err(EmbeddingError::InvalidInput(
                "batch_size must be > 0".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(Self::default_headers(&config.api_key)?)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpEmbeddingConfig {
        &self.config
    }

    fn default_headers(api_key: &str) -> Result<HeaderMap, EmbeddingError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| EmbeddingError::InvalidInput(format!("invalid api key: {e}")))?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embed", self.config.base_url.trim_end_matches('/'));
        let request = EmbedRequest {
            model: &self.config.model,
            parameters: EmbedParameters {
                input_type: role,
                truncate: "END",
            },
            inputs: texts.iter().map(|text| EmbedInput { text }).collect(),
        };

        let resp = self.http.post(url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let body: EmbedResponse = resp.json().await?;
        Ok(body.data.into_iter().map(|d| d.values).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed(
        &self,
        texts: &[String],
        role: EmbeddingRole,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            debug!("POST /embed with {} inputs ({role})", batch.len());
            let vectors = self.embed_batch(batch, role).await?;
            // A short batch would shift every later vector onto the wrong text.
            if vectors.len() != batch.len() {
                return Err(if vectors.is_empty() {
                    EmbeddingError::EmptyResponse
                } else {
                    EmbeddingError::CountMismatch {
                        expected: batch.len(),
                        actual: vectors.len(),
                    }
                });
            }
            all.extend(vectors);
        }
        Ok(all)
    }
}
