//! Bulk embedding of stored documents.
//!
//! Embeddings are computed once per content version and cached on the
//! document. At most `ingest.concurrency` documents are embedded at a time
//! so a large import does not flood the provider.

use std::path::Path;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Document, content_fingerprint};
use crate::engine::{SemanticSearch, VectorSource};
use crate::error::{Result, RetrievalError};
use crate::extract::TextExtractor;
use crate::store::DocumentStore;

/// Counts from one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Embedded by the provider.
    pub provider: usize,

    /// Embedded by the fallback embedder.
    pub fallback: usize,

    /// No embeddable content; cached embedding cleared.
    pub cleared: usize,

    /// Already up to date.
    pub unchanged: usize,

    /// Content changed while embedding; left for the next pass.
    pub stale: usize,

    /// Removed from the store while embedding.
    pub removed: usize,
}

impl IngestReport {
    /// Number of documents whose cache was written.
    pub fn updated(&self) -> usize {
        self.provider + self.fallback + self.cleared
    }

    fn record(&mut self, source: VectorSource) {
        match source {
            VectorSource::Provider => self.provider += 1,
            VectorSource::Fallback => self.fallback += 1,
        }
    }
}

/// Computes and caches document embeddings.
pub struct Ingestor<'a> {
    engine: &'a SemanticSearch,
    concurrency: usize,
}

impl<'a> Ingestor<'a> {
    /// Create an ingestor using the engine's embedders and configured concurrency.
    pub fn new(engine: &'a SemanticSearch) -> Self {
        Self {
            concurrency: engine.config().ingest.concurrency,
            engine,
        }
    }

    /// Override the number of concurrent embedding calls.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(RetrievalError::Config(
                "ingest concurrency must be greater than zero".to_string(),
            ));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Embed every document in `store` whose content changed since it was last embedded.
    pub async fn ingest(&self, store: &dyn DocumentStore) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let dimension = self.engine.config().embedding.dimension;

        let (pending, up_to_date): (Vec<Document>, Vec<Document>) = store
            .list()
            .await?
            .into_iter()
            .partition(|document| is_stale(document, dimension));
        report.unchanged = up_to_date.len();

        debug!(
            "Embedding {} documents with concurrency {}",
            pending.len(),
            self.concurrency
        );

        let mut pending_embeddings = stream::iter(pending)
            .map(|document| async move {
                let content_hash = content_fingerprint(&document.content);
                let embedded = self.engine.embed(&document.content).await;
                (document.id, content_hash, embedded)
            })
            .buffer_unordered(self.concurrency);

        while let Some((id, content_hash, embedded)) = pending_embeddings.next().await {
            let (written, source) = match embedded {
                Some(embedded) => (
                    store
                        .set_embedding(&id, embedded.embedding, &content_hash)
                        .await,
                    Some(embedded.source),
                ),
                None => (store.clear_embedding(&id, &content_hash).await, None),
            };

            match written {
                Ok(true) => match source {
                    Some(source) => report.record(source),
                    None => report.cleared += 1,
                },
                Ok(false) => report.stale += 1,
                Err(RetrievalError::NotFound(_)) => {
                    debug!("{id} removed during ingestion, discarding its embedding");
                    report.removed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Ingestion complete: {} provider, {} fallback, {} cleared, {} unchanged, {} stale, {} removed",
            report.provider,
            report.fallback,
            report.cleared,
            report.unchanged,
            report.stale,
            report.removed
        );

        Ok(report)
    }

    /// Extract `path`, store it as a document keyed by its path, and embed it.
    ///
    /// Tags and metadata of an existing document with the same id are kept.
    /// Unchanged content is not re-embedded.
    pub async fn ingest_file(
        &self,
        path: &Path,
        extractor: &dyn TextExtractor,
        store: &dyn DocumentStore,
    ) -> Result<Document> {
        let content = extractor.extract(path).await?;
        let id = path.display().to_string();

        let existing = store.get(&id).await?;
        if let Some(existing) = existing
            .as_ref()
            .filter(|existing| {
                existing.content == content
                    && !is_stale(existing, self.engine.config().embedding.dimension)
            })
        {
            debug!("{id} unchanged, keeping cached embedding");
            return Ok(existing.clone());
        }

        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.clone());

        let mut document = match existing {
            Some(existing) => Document {
                content,
                title,
                embedding: None,
                content_hash: None,
                embedded_at: None,
                ..existing
            },
            None => Document::new(id.clone(), title, content)
                .with_metadata("path", serde_json::json!(id)),
        };

        let embedded = self.engine.embed(&document.content).await;
        document = match embedded {
            Some(embedded) => {
                debug!("Embedded {id} via {:?}", embedded.source);
                document.with_embedding(embedded.embedding)
            }
            None => {
                document.content_hash = Some(content_fingerprint(&document.content));
                document.embedded_at = Some(Utc::now());
                document
            }
        };

        store.upsert(document.clone()).await?;
        Ok(document)
    }
}

/// Content changed since embedding, or the cached vector has another width
/// than the engine produces.
fn is_stale(document: &Document, dimension: usize) -> bool {
    document.needs_embedding()
        || document
            .embedding
            .as_ref()
            .is_some_and(|embedding| embedding.len() != dimension)
}

impl SemanticSearch {
    /// Ingestor sharing this engine's embedders and configuration.
    pub fn ingestor(&self) -> Ingestor<'_> {
        Ingestor::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingConfig, EmbeddingProviderType, RetrievalConfig};
    use crate::extract::PlainTextExtractor;
    use crate::store::InMemoryDocumentStore;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn offline_engine() -> SemanticSearch {
        SemanticSearch::builder()
            .with_config(RetrievalConfig::new().with_embedding(EmbeddingConfig {
                provider: EmbeddingProviderType::Fallback,
                dimension: 32,
                ..Default::default()
            }))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn ingest_embeds_then_skips_unchanged() {
        let engine = offline_engine();
        let store = InMemoryDocumentStore::with_documents([
            Document::new("a", "Invoice", "Q4 Invoice #123"),
            Document::new("b", "Empty", "   "),
        ]);

        let first = engine.ingestor().ingest(&store).await.unwrap();
        assert_eq!(
            first,
            IngestReport {
                provider: 1,
                cleared: 1,
                ..Default::default()
            }
        );

        let doc = store.get("a").await.unwrap().unwrap();
        assert_eq!(doc.embedding.map(|e| e.len()), Some(32));

        let second = engine.ingestor().ingest(&store).await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.updated(), 0);
    }

    #[tokio::test]
    async fn ingest_reembeds_changed_content() {
        let engine = offline_engine();
        let store = InMemoryDocumentStore::with_documents([Document::new("a", "A", "first draft")]);
        engine.ingestor().ingest(&store).await.unwrap();
        let before = store.get("a").await.unwrap().unwrap().embedding;

        let mut doc = store.get("a").await.unwrap().unwrap();
        doc.content = "final version".to_string();
        store.upsert(doc).await.unwrap();

        let report = engine.ingestor().ingest(&store).await.unwrap();
        assert_eq!(report.provider, 1);
        let after = store.get("a").await.unwrap().unwrap().embedding;
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn ingest_reembeds_cache_of_another_width() {
        let engine = offline_engine();
        let store = InMemoryDocumentStore::with_documents([
            Document::new("a", "Invoice", "Q4 Invoice #123").with_embedding(vec![1.0, 0.0, 0.0]),
        ]);
        assert!(!store.get("a").await.unwrap().unwrap().needs_embedding());

        let report = engine.ingestor().ingest(&store).await.unwrap();
        assert_eq!(report.provider, 1);
        assert_eq!(report.unchanged, 0);

        let doc = store.get("a").await.unwrap().unwrap();
        assert_eq!(doc.embedding.map(|e| e.len()), Some(32));

        let again = engine.ingestor().ingest(&store).await.unwrap();
        assert_eq!(again.unchanged, 1);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let engine = offline_engine();
        assert!(engine.ingestor().with_concurrency(0).is_err());
    }

    #[tokio::test]
    async fn ingest_file_creates_and_reuses_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("invoice.txt");
        tokio::fs::write(&path, "Q4 Invoice #123").await.unwrap();

        let engine = offline_engine();
        let store = InMemoryDocumentStore::new();
        let ingestor = engine.ingestor();

        let doc = ingestor
            .ingest_file(&path, &PlainTextExtractor, &store)
            .await
            .unwrap();
        assert_eq!(doc.title, "invoice");
        assert_eq!(doc.content, "Q4 Invoice #123");
        assert!(doc.embedding.is_some());
        assert!(!doc.needs_embedding());

        let again = ingestor
            .ingest_file(&path, &PlainTextExtractor, &store)
            .await
            .unwrap();
        assert_eq!(again.embedded_at, doc.embedded_at);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn ingest_file_keeps_tags_on_update() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        tokio::fs::write(&path, "Team lunch notes").await.unwrap();

        let engine = offline_engine();
        let store = InMemoryDocumentStore::new();
        let ingestor = engine.ingestor();

        let doc = ingestor
            .ingest_file(&path, &PlainTextExtractor, &store)
            .await
            .unwrap();
        store.upsert(doc.with_tag("team")).await.unwrap();

        tokio::fs::write(&path, "Team lunch notes, updated").await.unwrap();
        let updated = ingestor
            .ingest_file(&path, &PlainTextExtractor, &store)
            .await
            .unwrap();

        assert!(updated.tags.contains("team"));
        assert_eq!(updated.content, "Team lunch notes, updated");
        assert!(!updated.needs_embedding());
    }
}
