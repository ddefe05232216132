use crate::chunk::{ChunkMetadata, ChunkRecord, StoredChunk};
use crate::error::StoreError;
use crate::identity::{ChunkId, document_prefix};
use crate::index::VectorIndex;
use docrag_embeddings::{EmbeddingGateway, EmbeddingRole};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Configuration for the chunk store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkStoreConfig {
    /// Chunks embedded and written per round trip
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,

    /// Ids per delete call; hosted indexes cap this at 1000
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    /// Ids per fetch call
    #[serde(default = "default_fetch_batch_size")]
    pub fetch_batch_size: usize,

    /// Namespace for every index call, `None` for the default one
    #[serde(default)]
    pub namespace: Option<String>,
}

fn default_upsert_batch_size() -> usize {
    96
}

fn default_delete_batch_size() -> usize {
    1000
}

fn default_fetch_batch_size() -> usize {
    100
}

impl Default for ChunkStoreConfig {
    fn default() -> Self {
        Self {
            upsert_batch_size: default_upsert_batch_size(),
            delete_batch_size: default_delete_batch_size(),
            fetch_batch_size: default_fetch_batch_size(),
            namespace: None,
        }
    }
}

impl ChunkStoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.upsert_batch_size == 0 {
            return Err("upsert_batch_size must be > 0".to_string());
        }
        if self.delete_batch_size == 0 {
            return Err("delete_batch_size must be > 0".to_string());
        }
        if self.fetch_batch_size == 0 {
            return Err("fetch_batch_size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Writes, lists, reads back and deletes content-addressed chunks.
///
/// Chunks are embedded as passages before they are written. Nothing is rolled
/// back on failure: batches already written stay in the index, and writing the
/// same chunks again is safe because ids are derived from content.
#[derive(Clone)]
pub struct ChunkStore {
    index: Arc<dyn VectorIndex>,
    gateway: EmbeddingGateway,
    config: ChunkStoreConfig,
}

impl ChunkStore {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        gateway: EmbeddingGateway,
        config: ChunkStoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::InvalidInput)?;
        Ok(Self {
            index,
            gateway,
            config,
        })
    }

    /// The same store addressing another namespace
    pub fn with_namespace(&self, namespace: Option<String>) -> Self {
        let mut store = self.clone();
        store.config.namespace = namespace;
        store
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn gateway(&self) -> &EmbeddingGateway {
        &self.gateway
    }

    pub fn config(&self) -> &ChunkStoreConfig {
        &self.config
    }

    fn namespace(&self) -> Option<&str> {
        self.config.namespace.as_deref()
    }

    /// Embed and write `chunks` under `document_fingerprint`.
    ///
    /// Returns the number of records sent. Identical chunks collapse into
    /// one record in the index.
    pub async fn upsert(
        &self,
        document_fingerprint: &str,
        document_name: &str,
        chunks: &[String],
    ) -> Result<usize, StoreError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        info!(
            "Upserting {} chunks of '{document_name}' ({document_fingerprint})",
            chunks.len()
        );

        let mut written = 0;
        for batch in chunks.chunks(self.config.upsert_batch_size) {
            let vectors = self.gateway.embed(batch, EmbeddingRole::Passage).await?;

            let records: Vec<ChunkRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(text, vector)| ChunkRecord {
                    id: ChunkId::new(document_fingerprint, text),
                    vector,
                    metadata: ChunkMetadata {
                        text: text.clone(),
                        document_fingerprint: document_fingerprint.to_string(),
                        document_name: document_name.to_string(),
                    },
                })
                .collect();

            self.index.upsert(records, self.namespace()).await?;
            written += batch.len();
            debug!("Wrote {written}/{} chunks", chunks.len());
        }

        info!(
            "Upserted {written} chunks in {}ms",
            start.elapsed().as_millis()
        );
        Ok(written)
    }

    /// Up to `limit` ids starting with `prefix`, following pagination only as
    /// far as needed.
    pub async fn list_ids(
        &self,
        prefix: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ChunkId>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut ids = self.list_until(prefix, Some(limit)).await?;
        ids.truncate(limit);
        Ok(ids)
    }

    /// Every id starting with `prefix`
    pub async fn list_all_ids(&self, prefix: Option<&str>) -> Result<Vec<ChunkId>, StoreError> {
        self.list_until(prefix, None).await
    }

    async fn list_until(
        &self,
        prefix: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ChunkId>, StoreError> {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self
                .index
                .list_ids_page(prefix, cursor.as_deref(), self.namespace())
                .await?;
            pages += 1;
            let empty = page.ids.is_empty();
            ids.extend(page.ids);

            let satisfied = limit.is_some_and(|limit| ids.len() >= limit);
            match page.next_cursor {
                Some(next) if !satisfied => {
                    if empty || cursor.as_deref() == Some(next.as_str()) {
                        warn!(
                            "Index returned a page without progress (cursor {next}), stopping listing"
                        );
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        debug!("Listed {} ids in {pages} pages", ids.len());
        Ok(ids)
    }

    /// Delete every chunk of a document. Returns how many ids were deleted.
    pub async fn delete_by_document(&self, document_fingerprint: &str) -> Result<usize, StoreError> {
        let prefix = document_prefix(document_fingerprint);
        let ids = self.list_all_ids(Some(&prefix)).await?;
        if ids.is_empty() {
            info!("No chunks stored for document {document_fingerprint}");
            return Ok(0);
        }

        for batch in ids.chunks(self.config.delete_batch_size) {
            self.index.delete(batch, self.namespace()).await?;
        }

        info!(
            "Deleted {} chunks of document {document_fingerprint}",
            ids.len()
        );
        Ok(ids.len())
    }

    /// Stored chunks for `ids`, in the order given. Ids without a record or
    /// without text are skipped.
    pub async fn fetch_chunks(&self, ids: &[ChunkId]) -> Result<Vec<StoredChunk>, StoreError> {
        let mut found: HashMap<ChunkId, ChunkRecord> = HashMap::with_capacity(ids.len());
        for batch in ids.chunks(self.config.fetch_batch_size) {
            let records = self.index.fetch(batch, self.namespace()).await?;
            found.extend(records.into_iter().map(|r| (r.id.clone(), r)));
        }

        let chunks: Vec<StoredChunk> = ids
            .iter()
            .filter_map(|id| found.remove(id))
            .filter(|record| !record.metadata.text.trim().is_empty())
            .map(StoredChunk::from)
            .collect();

        if chunks.len() < ids.len() {
            debug!(
                "Fetched {} of {} chunks; the rest are missing or have no text",
                chunks.len(),
                ids.len()
            );
        }
        Ok(chunks)
    }
}
