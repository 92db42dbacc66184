//! Documents and search results.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use docsearch_embeddings::Embedding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A searchable document with an optional cached embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: String,

    /// Extracted text content.
    pub content: String,

    /// Human-readable title.
    pub title: String,

    /// Free-form labels.
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Cached embedding of `content`, if one has been computed.
    #[serde(default)]
    pub embedding: Option<Embedding>,

    /// Fingerprint of the content the cached embedding was computed from.
    #[serde(default)]
    pub content_hash: Option<String>,

    /// When the cached embedding was written.
    #[serde(default)]
    pub embedded_at: Option<DateTime<Utc>>,

    /// Arbitrary caller metadata.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    /// Create a document without an embedding.
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            title: title.into(),
            tags: BTreeSet::new(),
            embedding: None,
            content_hash: None,
            embedded_at: None,
            metadata: serde_json::Map::new(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach an embedding computed for the current content.
    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.content_hash = Some(content_fingerprint(&self.content));
        self.embedding = Some(embedding);
        self.embedded_at = Some(Utc::now());
        self
    }

    /// Whether the cached embedding (if any) no longer matches the content.
    pub fn needs_embedding(&self) -> bool {
        self.content_hash.as_deref() != Some(content_fingerprint(&self.content).as_str())
    }
}

/// SHA-256 hex digest used to detect content changes.
pub fn content_fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// A ranked document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matched document.
    pub document: Document,

    /// Relevance in `[-1, 1]`.
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_document_needs_embedding() {
        let doc = Document::new("a", "Invoice", "Q4 Invoice #123");
        assert!(doc.needs_embedding());
        assert!(doc.embedding.is_none());
    }

    #[test]
    fn embedded_document_goes_stale_when_content_changes() {
        let mut doc = Document::new("a", "Invoice", "Q4 Invoice #123").with_embedding(vec![1.0]);
        assert!(!doc.needs_embedding());

        doc.content.push_str(" (paid)");
        assert!(doc.needs_embedding());
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        assert_eq!(
            content_fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn deserializes_without_optional_fields() {
        let doc: Document =
            serde_json::from_str(r#"{"id":"b","content":"Team lunch notes","title":"Lunch"}"#)
                .unwrap();
        assert_eq!(doc, Document::new("b", "Lunch", "Team lunch notes"));
    }
}
