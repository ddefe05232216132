use crate::error::RegistryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A document whose chunks were written to the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentEntry {
    /// Display name the document was uploaded under
    pub name: String,

    /// Prefix of every chunk id of this document
    pub fingerprint: String,

    pub created_at: DateTime<Utc>,
}

impl DocumentEntry {
    pub fn new(name: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: fingerprint.into(),
            created_at: Utc::now(),
        }
    }
}

/// Bookkeeping of uploaded documents
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Record a document, replacing any entry with the same fingerprint
    async fn register(&self, entry: DocumentEntry) -> Result<(), RegistryError>;

    /// Forget a document. Returns `false` when it was not registered.
    async fn remove(&self, fingerprint: &str) -> Result<bool, RegistryError>;

    /// Registered documents, oldest first
    async fn list(&self) -> Result<Vec<DocumentEntry>, RegistryError>;
}

/// Registry kept in a single JSON file
#[derive(Clone)]
pub struct FileRegistry {
    path: PathBuf,
    entries: Arc<RwLock<Vec<DocumentEntry>>>,
}

impl FileRegistry {
    pub async fn open(path: &Path) -> Result<Self, RegistryError> {
        let entries: Vec<DocumentEntry> = if tokio::fs::try_exists(path).await? {
            let content = tokio::fs::read(path).await?;
            serde_json::from_slice(&content)?
        } else {
            Vec::new()
        };

        debug!(
            "Loaded {} registry entries from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries: Arc::new(RwLock::new(entries)),
        })
    }

    async fn save(&self, entries: &[DocumentEntry]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRegistry for FileRegistry {
    async fn register(&self, entry: DocumentEntry) -> Result<(), RegistryError> {
        let mut entries = self.entries.write().await;
        entries.retain(|e| e.fingerprint != entry.fingerprint);
        entries.push(entry);
        self.save(&entries).await
    }

    async fn remove(&self, fingerprint: &str) -> Result<bool, RegistryError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.fingerprint != fingerprint);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<DocumentEntry>, RegistryError> {
        Ok(self.entries.read().await.clone())
    }
}
