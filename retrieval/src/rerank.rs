use crate::error::RerankError;
use crate::result::RetrievedChunk;
use async_trait::async_trait;
use docrag_vector_store::IndexMatch;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Default reranking model
pub const DEFAULT_RERANK_MODEL: &str = "bge-reranker-v2-m3";

const API_VERSION: &str = "2025-04";

/// One reranker verdict: a position in the submitted document list
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankHit {
    pub index: usize,
    pub score: f32,
}

/// Second-pass relevance scoring of dense candidates
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, returning at most `top_n` hits by
    /// descending relevance
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, RerankError>;
}

/// Rebuild the final list from rerank hits, then backfill from dense order.
///
/// Hits are taken by descending score whatever order the service returned
/// them in; equal scores keep service order. Hits pointing outside
/// `candidates` or at a position already used are discarded. Backfill skips
/// ids that are already present.
pub fn merge_reranked(
    candidates: Vec<IndexMatch>,
    hits: &[RerankHit],
    top_k: usize,
) -> Vec<RetrievedChunk> {
    let mut used = vec![false; candidates.len()];
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(top_k);

    let mut hits = hits.to_vec();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));

    for hit in hits {
        if merged.len() >= top_k {
            break;
        }
        let Some(candidate) = candidates.get(hit.index) else {
            debug!("Discarding rerank hit with out-of-range index {}", hit.index);
            continue;
        };
        if used[hit.index] || !seen.insert(candidate.id.clone()) {
            continue;
        }
        used[hit.index] = true;
        merged.push(RetrievedChunk::reranked(candidate, hit.score));
    }

    for (position, candidate) in candidates.into_iter().enumerate() {
        if merged.len() >= top_k {
            break;
        }
        if used[position] || !seen.insert(candidate.id.clone()) {
            continue;
        }
        merged.push(RetrievedChunk::dense(candidate));
    }

    merged
}

/// Configuration for the hosted reranker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRerankerConfig {
    /// Base URL of the inference API
    pub base_url: String,

    /// API key sent in the `Api-Key` header
    pub api_key: String,

    /// Rerank model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_RERANK_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpRerankerConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<RerankDocument<'a>>,
    top_n: usize,
    return_documents: bool,
}

#[derive(Serialize)]
struct RerankDocument<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct RerankResponse {
    #[serde(default)]
    data: Vec<RerankHit>,
}

/// Reranker backed by a hosted inference endpoint.
pub struct HttpReranker {
    http: reqwest::Client,
    config: HttpRerankerConfig,
}

impl HttpReranker {
    pub fn new(config: HttpRerankerConfig) -> Result<Self, RerankError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| RerankError::Request(format!("invalid api key: {e}")))?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpRerankerConfig {
        &self.config
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankHit>, RerankError> {
        let url = format!("{}/rerank", self.config.base_url.trim_end_matches('/'));
        let request = RerankRequest {
            model: &self.config.model,
            query,
            documents: documents
                .iter()
                .map(|text| RerankDocument { text })
                .collect(),
            top_n,
            return_documents: false,
        };

        debug!("POST /rerank with {} documents, top_n={top_n}", documents.len());
        let resp = self.http.post(url).json(&request).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(RerankError::Status { status, body });
        }

        let body = resp.bytes().await?;
        let parsed: RerankResponse = serde_json::from_slice(&body)
            .map_err(|e| RerankError::InvalidResponse(e.to_string()))?;
        Ok(parsed.data)
    }
}
