use crate::chunk::{ChunkRecord, IdPage, IndexMatch};
use crate::error::IndexError;
use crate::identity::ChunkId;
use async_trait::async_trait;

/// A vector index holding [`ChunkRecord`]s, optionally partitioned into
/// namespaces. `None` addresses the default namespace.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records by id
    async fn upsert(
        &self,
        records: Vec<ChunkRecord>,
        namespace: Option<&str>,
    ) -> Result<(), IndexError>;

    /// The `top_k` records most similar to `vector`, best first
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<IndexMatch>, IndexError>;

    /// One page of ids starting with `prefix`. Pass the previous page's
    /// `next_cursor` to continue.
    async fn list_ids_page(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<IdPage, IndexError>;

    /// Stored records for `ids`; unknown ids are absent from the result
    async fn fetch(
        &self,
        ids: &[ChunkId],
        namespace: Option<&str>,
    ) -> Result<Vec<ChunkRecord>, IndexError>;

    /// Delete records by id; unknown ids are ignored
    async fn delete(&self, ids: &[ChunkId], namespace: Option<&str>) -> Result<(), IndexError>;
}
