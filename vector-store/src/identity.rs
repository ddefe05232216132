//! Content-addressed chunk identities.
//!
//! A chunk id is `"{document_fingerprint}#{content_fingerprint}"`. Both halves
//! are lowercase hex SHA-256 digests, so the separator can never appear inside
//! either of them and a document's chunks all share the `"{fp}#"` prefix.

use crate::error::ChunkIdError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const SEPARATOR: char = '#';

/// Lowercase hex SHA-256 of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash = hasher.finalize();
    format!("{hash:x}")
}

/// Fingerprint of a document, keyed by its display name.
///
/// Re-uploading a document under the same name lands under the same prefix.
pub fn document_fingerprint(name: &str) -> String {
    fingerprint(name.as_bytes())
}

/// Prefix shared by every chunk id of a document
pub fn document_prefix(document_fingerprint: &str) -> String {
    format!("{document_fingerprint}{SEPARATOR}")
}

/// Stable identity of a chunk inside the vector index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Identity of `content` inside the document with `document_fingerprint`
    pub fn new(document_fingerprint: &str, content: &str) -> Self {
        Self::from_parts(document_fingerprint, &fingerprint(content.as_bytes()))
    }

    pub fn from_parts(document_fingerprint: &str, content_fingerprint: &str) -> Self {
        Self(format!(
            "{document_fingerprint}{SEPARATOR}{content_fingerprint}"
        ))
    }

    /// Validate a raw id: exactly one separator and two non-empty halves
    pub fn parse(raw: &str) -> Result<Self, ChunkIdError> {
        match raw.split_once(SEPARATOR) {
            Some((doc, content))
                if !doc.is_empty() && !content.is_empty() && !content.contains(SEPARATOR) =>
            {
                Ok(Self(raw.to_string()))
            }
            _ => Err(ChunkIdError(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document half, or the whole id when it has no separator
    pub fn document_fingerprint(&self) -> &str {
        self.0
            .split_once(SEPARATOR)
            .map_or(self.0.as_str(), |(doc, _)| doc)
    }

    /// The content half, empty when the id has no separator
    pub fn content_fingerprint(&self) -> &str {
        self.0
            .split_once(SEPARATOR)
            .map_or("", |(_, content)| content)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Ids coming back from an index are taken as-is; use [`ChunkId::parse`] to
/// validate untrusted input.
impl From<String> for ChunkId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for ChunkId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl AsRef<str> for ChunkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
