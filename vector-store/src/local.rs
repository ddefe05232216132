use crate::chunk::{ChunkRecord, IdPage, IndexMatch};
use crate::error::IndexError;
use crate::identity::ChunkId;
use crate::index::VectorIndex;
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Configuration for the local index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalIndexConfig {
    /// Number of ids returned per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    100
}

impl LocalIndexConfig {
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.page_size == 0 {
            return Err(IndexError::InvalidConfig("page_size must be > 0".to_string()));
        }
        Ok(())
    }
}

impl Default for LocalIndexConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

type Namespace = BTreeMap<ChunkId, ChunkRecord>;

/// On-disk layout: namespace name (empty for the default one) to records
#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    namespaces: BTreeMap<String, Vec<ChunkRecord>>,
}

/// In-process vector index with optional JSON-file persistence.
///
/// Listing is ordered by id and paginated with a numeric offset cursor.
/// Similarity is cosine; ties keep id order.
#[derive(Clone)]
pub struct LocalIndex {
    path: Option<PathBuf>,
    config: LocalIndexConfig,
    namespaces: Arc<RwLock<BTreeMap<String, Namespace>>>,
}

impl LocalIndex {
    /// An index that lives only in memory
    pub fn in_memory(config: LocalIndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self {
            path: None,
            config,
            namespaces: Arc::new(RwLock::new(BTreeMap::new())),
        })
    }

    /// Open (or create) an index persisted at `path`
    pub async fn open(path: &Path, config: LocalIndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        info!("Opening local index at {}", path.display());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let namespaces = if tokio::fs::try_exists(path).await? {
            Self::load_from_disk(path).await?
        } else {
            BTreeMap::new()
        };

        let total: usize = namespaces.values().map(BTreeMap::len).sum();
        info!("Local index ready with {total} records");

        Ok(Self {
            path: Some(path.to_path_buf()),
            config,
            namespaces: Arc::new(RwLock::new(namespaces)),
        })
    }

    pub fn config(&self) -> &LocalIndexConfig {
        &self.config
    }

    /// Number of records in a namespace
    pub async fn count(&self, namespace: Option<&str>) -> usize {
        let namespaces = self.namespaces.read().await;
        namespaces
            .get(namespace_key(namespace))
            .map_or(0, BTreeMap::len)
    }

    async fn load_from_disk(path: &Path) -> Result<BTreeMap<String, Namespace>, IndexError> {
        let content = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&content)?;
        Ok(snapshot
            .namespaces
            .into_iter()
            .map(|(name, records)| {
                let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
                (name, records)
            })
            .collect())
    }

    async fn save_to_disk(&self, namespaces: &BTreeMap<String, Namespace>) -> Result<(), IndexError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot = Snapshot {
            namespaces: namespaces
                .iter()
                .map(|(name, records)| (name.clone(), records.values().cloned().collect()))
                .collect(),
        };
        let content = serde_json::to_vec(&snapshot)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

fn namespace_key(namespace: Option<&str>) -> &str {
    namespace.unwrap_or_default()
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(
        &self,
        records: Vec<ChunkRecord>,
        namespace: Option<&str>,
    ) -> Result<(), IndexError> {
        if records.is_empty() {
            return Ok(());
        }

        debug!("Upserting {} records into local index", records.len());

        let mut namespaces = self.namespaces.write().await;
        let target = namespaces
            .entry(namespace_key(namespace).to_string())
            .or_default();
        for record in records {
            target.insert(record.id.clone(), record);
        }
        self.save_to_disk(&namespaces).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<IndexMatch>, IndexError> {
        let namespaces = self.namespaces.read().await;
        let Some(records) = namespaces.get(namespace_key(namespace)) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(&ChunkRecord, f32)> = records
            .values()
            .map(|record| (record, cosine_similarity(vector, &record.vector)))
            .collect();

        // Sort by similarity (descending)
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let matches: Vec<IndexMatch> = scored
            .into_iter()
            .take(top_k)
            .map(|(record, score)| IndexMatch {
                id: record.id.clone(),
                score,
                metadata: record.metadata.clone(),
            })
            .collect();

        debug!("Local query returned {} matches", matches.len());
        Ok(matches)
    }

    async fn list_ids_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<IdPage, IndexError> {
        let offset = match cursor {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| IndexError::InvalidCursor(raw.to_string()))?,
            None => 0,
        };

        let namespaces = self.namespaces.read().await;
        let Some(records) = namespaces.get(namespace_key(namespace)) else {
            return Ok(IdPage::default());
        };

        let prefix = prefix.unwrap_or_default();
        let mut matching = records
            .keys()
            .filter(|id| id.as_str().starts_with(prefix))
            .skip(offset);

        let ids: Vec<ChunkId> = matching.by_ref().take(self.config.page_size).cloned().collect();
        let next_cursor = matching
            .next()
            .map(|_| (offset + ids.len()).to_string());

        Ok(IdPage { ids, next_cursor })
    }

    async fn fetch(
        &self,
        ids: &[ChunkId],
        namespace: Option<&str>,
    ) -> Result<Vec<ChunkRecord>, IndexError> {
        let namespaces = self.namespaces.read().await;
        let Some(records) = namespaces.get(namespace_key(namespace)) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    async fn delete(&self, ids: &[ChunkId], namespace: Option<&str>) -> Result<(), IndexError> {
        let mut namespaces = self.namespaces.write().await;
        let Some(records) = namespaces.get_mut(namespace_key(namespace)) else {
            return Ok(());
        };

        let before = records.len();
        for id in ids {
            records.remove(id);
        }
        debug!("Deleted {} records from local index", before - records.len());

        self.save_to_disk(&namespaces).await
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
