use crate::identity::ChunkId;
use serde::{Deserialize, Serialize};

/// Metadata stored next to every vector.
///
/// Field names on the wire match what the hosted index already holds
/// (`file_key`, `file_name`), so records written by either backend read back
/// the same way.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChunkMetadata {
    /// The chunk text, needed to rerank and to generate questions
    #[serde(default)]
    pub text: String,

    /// Fingerprint of the document the chunk belongs to
    #[serde(default, rename = "file_key")]
    pub document_fingerprint: String,

    /// Display name of the document
    #[serde(default, rename = "file_name")]
    pub document_name: String,
}

/// A vector with its identity and metadata, as held by the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub id: ChunkId,

    #[serde(default, rename = "values")]
    pub vector: Vec<f32>,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// One similarity-search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMatch {
    pub id: ChunkId,

    /// Similarity score (higher is better)
    pub score: f32,

    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// One page of an id listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdPage {
    pub ids: Vec<ChunkId>,

    /// Cursor for the next page, `None` on the last page
    pub next_cursor: Option<String>,
}

/// A chunk read back from the index, without its vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredChunk {
    pub id: ChunkId,
    pub metadata: ChunkMetadata,
}

impl StoredChunk {
    pub fn text(&self) -> &str {
        &self.metadata.text
    }
}

impl From<ChunkRecord> for StoredChunk {
    fn from(record: ChunkRecord) -> Self {
        Self {
            id: record.id,
            metadata: record.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_metadata_wire_names() {
        let metadata = ChunkMetadata {
            text: "hello".to_string(),
            document_fingerprint: "abc".to_string(),
            document_name: "doc.pdf".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&metadata).unwrap(),
            json!({ "text": "hello", "file_key": "abc", "file_name": "doc.pdf" })
        );
    }

    #[test]
    fn test_record_tolerates_missing_fields() {
        let record: ChunkRecord = serde_json::from_value(json!({ "id": "a#b" })).unwrap();

        assert_eq!(record.id.as_str(), "a#b");
        assert!(record.vector.is_empty());
        assert_eq!(record.metadata, ChunkMetadata::default());
    }
}
