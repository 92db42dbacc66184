//! Document storage.
//!
//! The engine only reads documents during search. Writes to cached
//! embeddings go through [`DocumentStore::set_embedding`] and
//! [`DocumentStore::clear_embedding`], which the ingestion path calls.

use async_trait::async_trait;
use chrono::Utc;
use docsearch_embeddings::Embedding;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Document, content_fingerprint};
use crate::error::{Result, RetrievalError};

/// Repository of documents with optional cached embeddings.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Snapshot of every document, in a stable order.
    async fn list(&self) -> Result<Vec<Document>>;

    /// Fetch one document.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Insert or replace a document.
    ///
    /// Replacing a document with different content drops its cached embedding.
    async fn upsert(&self, document: Document) -> Result<()>;

    /// Remove a document, returning it if it existed.
    async fn remove(&self, id: &str) -> Result<Option<Document>>;

    /// Cache an embedding computed from content with the given fingerprint.
    ///
    /// Returns `false` without writing when the document's content changed
    /// after the embedding was computed.
    async fn set_embedding(
        &self,
        id: &str,
        embedding: Embedding,
        content_hash: &str,
    ) -> Result<bool>;

    /// Drop the cached embedding, marking the document as embedded-empty for
    /// the given content fingerprint.
    async fn clear_embedding(&self, id: &str, content_hash: &str) -> Result<bool>;
}

/// In-memory store that keeps insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<IndexMap<String, Document>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with documents.
    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let documents = documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self) -> Result<Vec<Document>> {
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn upsert(&self, mut document: Document) -> Result<()> {
        let mut documents = self.documents.write().await;
        let content_changed = documents
            .get(&document.id)
            .is_some_and(|existing| existing.content != document.content);
        if content_changed && document.needs_embedding() {
            debug!("Content changed for {}, dropping cached embedding", document.id);
            document.embedding = None;
            document.content_hash = None;
            document.embedded_at = None;
        }
        documents.insert(document.id.clone(), document);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.write().await.shift_remove(id))
    }

    async fn set_embedding(
        &self,
        id: &str,
        embedding: Embedding,
        content_hash: &str,
    ) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(id)
            .ok_or_else(|| RetrievalError::NotFound(id.to_string()))?;

        if content_fingerprint(&document.content) != content_hash {
            debug!("Skipping stale embedding for {id}");
            return Ok(false);
        }

        document.embedding = Some(embedding);
        document.content_hash = Some(content_hash.to_string());
        document.embedded_at = Some(Utc::now());
        Ok(true)
    }

    async fn clear_embedding(&self, id: &str, content_hash: &str) -> Result<bool> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(id)
            .ok_or_else(|| RetrievalError::NotFound(id.to_string()))?;

        if content_fingerprint(&document.content) != content_hash {
            return Ok(false);
        }

        document.embedding = None;
        document.content_hash = Some(content_hash.to_string());
        document.embedded_at = Some(Utc::now());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = InMemoryDocumentStore::new();
        for id in ["c", "a", "b"] {
            store.upsert(Document::new(id, id, "text")).await.unwrap();
        }
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn set_embedding_writes_when_content_unchanged() {
        let store = InMemoryDocumentStore::with_documents([Document::new("a", "A", "hello")]);
        let written = store
            .set_embedding("a", vec![1.0, 0.0], &content_fingerprint("hello"))
            .await
            .unwrap();
        assert!(written);

        let doc = store.get("a").await.unwrap().unwrap();
        assert_eq!(doc.embedding, Some(vec![1.0, 0.0]));
        assert!(!doc.needs_embedding());
        assert!(doc.embedded_at.is_some());
    }

    #[tokio::test]
    async fn set_embedding_skips_stale_content() {
        let store = InMemoryDocumentStore::with_documents([Document::new("a", "A", "new text")]);
        let written = store
            .set_embedding("a", vec![1.0], &content_fingerprint("old text"))
            .await
            .unwrap();
        assert!(!written);
        assert!(store.get("a").await.unwrap().unwrap().embedding.is_none());
    }

    #[tokio::test]
    async fn set_embedding_on_missing_document_fails() {
        let store = InMemoryDocumentStore::new();
        let err = store.set_embedding("nope", vec![1.0], "x").await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn upsert_with_new_content_drops_embedding() {
        let store = InMemoryDocumentStore::with_documents([
            Document::new("a", "A", "hello").with_embedding(vec![1.0]),
        ]);
        let mut changed = store.get("a").await.unwrap().unwrap();
        changed.content = "goodbye".to_string();
        store.upsert(changed).await.unwrap();

        let doc = store.get("a").await.unwrap().unwrap();
        assert!(doc.embedding.is_none());
        assert!(doc.needs_embedding());
    }

    #[tokio::test]
    async fn upsert_with_fresh_embedding_keeps_it() {
        let store = InMemoryDocumentStore::with_documents([Document::new("a", "A", "hello")]);
        store
            .upsert(Document::new("a", "A", "goodbye").with_embedding(vec![0.5]))
            .await
            .unwrap();
        assert_eq!(
            store.get("a").await.unwrap().unwrap().embedding,
            Some(vec![0.5])
        );
    }

    #[tokio::test]
    async fn clear_embedding_marks_content_as_processed() {
        let store = InMemoryDocumentStore::with_documents([
            Document::new("a", "A", "   ").with_embedding(vec![1.0]),
        ]);
        assert!(store.clear_embedding("a", &content_fingerprint("   ")).await.unwrap());

        let doc = store.get("a").await.unwrap().unwrap();
        assert!(doc.embedding.is_none());
        assert!(!doc.needs_embedding());
    }

    #[tokio::test]
    async fn remove_returns_document() {
        let store = InMemoryDocumentStore::with_documents([Document::new("a", "A", "x")]);
        assert!(store.remove("a").await.unwrap().is_some());
        assert!(store.is_empty().await);
        assert!(store.remove("a").await.unwrap().is_none());
    }
}
