use crate::chunk::{ChunkMetadata, ChunkRecord, IdPage, IndexMatch};
use crate::error::IndexError;
use crate::identity::ChunkId;
use crate::index::VectorIndex;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const API_VERSION: &str = "2025-04";

/// Configuration for a hosted index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpIndexConfig {
    /// Data-plane host of the index, with or without scheme
    pub host: String,

    /// API key sent in the `Api-Key` header
    pub api_key: String,

    /// Ids requested per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> usize {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpIndexConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }

    fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [ChunkRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [ChunkId],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    vectors: Vec<ListedId>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct ListedId {
    id: ChunkId,
}

#[derive(Deserialize)]
struct Pagination {
    #[serde(default)]
    next: Option<String>,
}

/// Fetch results come back keyed by id or as a plain list, under either
/// `vectors` or `records` depending on the API version.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordSet {
    Map(BTreeMap<String, WireRecord>),
    List(Vec<WireRecord>),
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(default)]
    id: Option<ChunkId>,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<ChunkMetadata>,
}

impl WireRecord {
    fn into_record(self, key: Option<String>) -> Option<ChunkRecord> {
        let id = self.id.or_else(|| key.map(ChunkId::from))?;
        Some(ChunkRecord {
            id,
            vector: self.values,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: Option<RecordSet>,
    #[serde(default)]
    records: Option<RecordSet>,
}

impl FetchResponse {
    fn into_records(self) -> Vec<ChunkRecord> {
        match self.vectors.or(self.records) {
            Some(RecordSet::Map(map)) => map
                .into_iter()
                .filter_map(|(key, wire)| wire.into_record(Some(key)))
                .collect(),
            Some(RecordSet::List(list)) => list
                .into_iter()
                .filter_map(|wire| wire.into_record(None))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// REST client for a hosted vector index.
pub struct HttpIndex {
    http: reqwest::Client,
    base_url: String,
    config: HttpIndexConfig,
}

impl HttpIndex {
    pub fn new(config: HttpIndexConfig) -> Result<Self, IndexError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "api-key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|e| IndexError::Request(format!("invalid api key: {e}")))?,
        );
        headers.insert("x-pinecone-api-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            config,
        })
    }

    pub fn config(&self) -> &HttpIndexConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, IndexError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexError::Status { status, body });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, IndexError> {
        let resp = self.send(request).await?;
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| IndexError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for HttpIndex {
    async fn upsert(
        &self,
        records: Vec<ChunkRecord>,
        namespace: Option<&str>,
    ) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        debug!("POST /vectors/upsert with {} records", records.len());
        let body = UpsertRequest {
            vectors: &records,
            namespace,
        };
        self.send(self.http.post(self.url("/vectors/upsert")).json(&body))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        debug!("POST /query with top_k={top_k}");
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace,
        };
        let resp: QueryResponse = self
            .send_json(self.http.post(self.url("/query")).json(&body))
            .await?;
        Ok(resp.matches)
    }

    async fn list_ids_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<IdPage, IndexError> {
        let limit = self.config.page_size.to_string();
        let mut params: Vec<(&str, &str)> = vec![("limit", limit.as_str())];
        if let Some(prefix) = prefix {
            params.push(("prefix", prefix));
        }
        if let Some(cursor) = cursor {
            params.push(("paginationToken", cursor));
        }
        if let Some(namespace) = namespace {
            params.push(("namespace", namespace));
        }

        let resp: ListResponse = self
            .send_json(self.http.get(self.url("/vectors/list")).query(&params))
            .await?;
        Ok(IdPage {
            ids: resp.vectors.into_iter().map(|v| v.id).collect(),
            next_cursor: resp
                .pagination
                .and_then(|p| p.next)
                .filter(|next| !next.is_empty()),
        })
    }

    async fn fetch(
        &self,
        ids: &[ChunkId],
        namespace: Option<&str>,
    ) -> Result<Vec<ChunkRecord>, IndexError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        if let Some(namespace) = namespace {
            params.push(("namespace", namespace));
        }

        let resp: FetchResponse = self
            .send_json(self.http.get(self.url("/vectors/fetch")).query(&params))
            .await?;
        Ok(resp.into_records())
    }

    async fn delete(&self, ids: &[ChunkId], namespace: Option<&str>) -> Result<(), IndexError> {
        if ids.is_empty() {
            return Ok(());
        }

        debug!("POST /vectors/delete with {} ids", ids.len());
        let body = DeleteRequest { ids, namespace };
        self.send(self.http.post(self.url("/vectors/delete")).json(&body))
            .await?;
        Ok(())
    }
}
