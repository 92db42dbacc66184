//! Search orchestration.
//!
//! [`SemanticSearch`] normalizes the query, obtains exactly one query vector
//! (provider first, [`FallbackEmbedder`] when the provider is unavailable or
//! slow), scores every document carrying a compatible cached embedding, and
//! returns the best `limit` results. When no document has a usable
//! embedding it degrades to case-insensitive substring matching.
//!
//! Search never writes to documents and never fails because of the provider.

use std::cmp::Reverse;
use std::sync::Arc;

use docsearch_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, EmbeddingRequest, FallbackEmbedder, OpenAIProvider,
    cosine_similarity, normalize_text_with_limit,
};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmbeddingProviderType, RetrievalConfig};
use crate::document::{Document, SearchResult};
use crate::error::Result;
use crate::store::DocumentStore;

/// Where a vector came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSource {
    /// The configured embedding provider.
    Provider,
    /// The local feature-hashing embedder.
    Fallback,
}

/// A vector together with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
    /// The vector.
    pub embedding: Embedding,

    /// Which embedder produced it.
    pub source: VectorSource,
}

/// How a search was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// The query normalized to nothing.
    EmptyQuery,
    /// Documents ranked by cosine similarity.
    Vector,
    /// No usable embeddings; documents matched by substring.
    Substring,
}

/// Results plus a description of the path that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Ranked results, best first.
    pub results: Vec<SearchResult>,

    /// Which ranking path ran.
    pub mode: SearchMode,

    /// Origin of the query vector, when one was computed.
    pub query_source: Option<VectorSource>,
}

impl SearchOutcome {
    fn empty_query() -> Self {
        Self {
            results: Vec::new(),
            mode: SearchMode::EmptyQuery,
            query_source: None,
        }
    }
}

/// Semantic search over a document collection.
///
/// Holds no mutable state, so one instance can serve concurrent searches.
pub struct SemanticSearch {
    /// Configuration.
    config: RetrievalConfig,

    /// Primary embedder.
    provider: Arc<dyn EmbeddingProvider>,

    /// Used whenever the provider cannot answer.
    fallback: FallbackEmbedder,
}

impl SemanticSearch {
    /// Create a new search engine builder.
    pub fn builder() -> SemanticSearchBuilder {
        SemanticSearchBuilder::new()
    }

    /// Create an engine around an explicit provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        let fallback = FallbackEmbedder::new(config.embedding.dimension)?
            .with_max_input_chars(config.embedding.max_input_chars);

        debug!(
            "Search engine using provider {} with dimension {}",
            provider.name(),
            config.embedding.dimension
        );

        Ok(Self {
            config,
            provider,
            fallback,
        })
    }

    /// Create an engine with the provider named in the configuration.
    pub fn from_config(config: RetrievalConfig) -> Result<Self> {
        let provider = provider_from_config(&config)?;
        Self::new(provider, config)
    }

    /// The active configuration.
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// The primary provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Normalize text the same way queries and documents are normalized.
    pub fn normalize(&self, text: &str) -> String {
        normalize_text_with_limit(text, self.config.embedding.max_input_chars)
    }

    /// Embed `text`, trying the provider first.
    ///
    /// Returns `None` when the text normalizes to nothing.
    pub async fn embed(&self, text: &str) -> Option<EmbeddedText> {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return None;
        }
        Some(self.embed_normalized(normalized).await)
    }

    async fn embed_normalized(&self, normalized: String) -> EmbeddedText {
        if !self.provider.is_available() {
            debug!(
                "Provider {} not available, using fallback embedder",
                self.provider.name()
            );
            return self.fallback_embed(&normalized);
        }

        match self.provider_embed(normalized.clone()).await {
            Ok(embedding) => EmbeddedText {
                embedding,
                source: VectorSource::Provider,
            },
            Err(e) => {
                if e.is_provider_unavailable() {
                    warn!(
                        "Provider {} unavailable: {e}; using fallback embedder",
                        self.provider.name()
                    );
                } else {
                    warn!(
                        "Provider {} failed: {e}; using fallback embedder",
                        self.provider.name()
                    );
                }
                self.fallback_embed(&normalized)
            }
        }
    }

    /// One provider call bounded by the configured timeout. A late answer or one
    /// of the wrong width is reported as an error.
    async fn provider_embed(
        &self,
        normalized: String,
    ) -> docsearch_embeddings::Result<Embedding> {
        let embedding_config = &self.config.embedding;
        let mut request = EmbeddingRequest::new(normalized);
        if let Some(model) = &embedding_config.model {
            request = request.with_model(model.clone());
        }

        let response = tokio::time::timeout(
            embedding_config.provider_timeout(),
            self.provider.embed(request),
        )
        .await
        .unwrap_or_else(|_| {
            Err(EmbeddingError::Timeout {
                timeout_ms: embedding_config.provider_timeout_ms,
            })
        })?;

        if response.embedding.len() != embedding_config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: embedding_config.dimension,
                actual: response.embedding.len(),
            });
        }
        Ok(response.embedding)
    }

    fn fallback_embed(&self, normalized: &str) -> EmbeddedText {
        EmbeddedText {
            embedding: self.fallback.embed_text(normalized),
            source: VectorSource::Fallback,
        }
    }

    /// Rank `documents` against `query` and return at most `limit` results.
    pub async fn search(&self, query: &str, documents: &[Document], limit: usize) -> Vec<SearchResult> {
        self.search_detailed(query, documents, limit).await.results
    }

    /// [`Self::search`] with the configured default limit.
    pub async fn search_with_default_limit(
        &self,
        query: &str,
        documents: &[Document],
    ) -> Vec<SearchResult> {
        self.search(query, documents, self.config.search.default_limit)
            .await
    }

    /// Search a snapshot of everything in `store`.
    pub async fn search_store(
        &self,
        query: &str,
        store: &dyn DocumentStore,
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let documents = store.list().await?;
        Ok(self.search(query, &documents, limit).await)
    }

    /// Like [`Self::search`], also reporting which path produced the results.
    pub async fn search_detailed(
        &self,
        query: &str,
        documents: &[Document],
        limit: usize,
    ) -> SearchOutcome {
        let normalized = self.normalize(query);
        if normalized.is_empty() {
            debug!("Empty query, returning no results");
            return SearchOutcome::empty_query();
        }

        let query_vector = self.embed_normalized(normalized.clone()).await;
        let scored = self.score(&query_vector.embedding, documents);

        let (mode, ranked) = if scored.is_empty() {
            debug!("No usable document embeddings, matching by substring");
            (SearchMode::Substring, self.substring_matches(&normalized, documents))
        } else {
            (SearchMode::Vector, scored)
        };

        let results = rank(ranked, limit)
            .into_iter()
            .map(|(index, similarity)| SearchResult {
                document: documents[index].clone(),
                similarity,
            })
            .collect::<Vec<_>>();

        debug!(
            "Search returned {} results ({mode:?}, query vector from {:?})",
            results.len(),
            query_vector.source
        );

        SearchOutcome {
            results,
            mode,
            query_source: Some(query_vector.source),
        }
    }

    /// Cosine scores for every document with a compatible embedding, keyed by position.
    fn score(&self, query: &[f32], documents: &[Document]) -> Vec<(usize, f32)> {
        let mut scored = Vec::with_capacity(documents.len());

        for (index, document) in documents.iter().enumerate() {
            let Some(embedding) = &document.embedding else {
                continue;
            };

            match cosine_similarity(query, embedding) {
                Ok(similarity) if similarity.is_finite() => scored.push((index, similarity)),
                Ok(_) => debug!("Skipping {}: non-finite similarity", document.id),
                Err(e) => debug!("Skipping {}: {e}", document.id),
            }
        }

        scored
    }

    /// Documents whose content or title contains the query, ignoring case.
    fn substring_matches(&self, normalized_query: &str, documents: &[Document]) -> Vec<(usize, f32)> {
        let needle = normalized_query.to_lowercase();
        let score = self.config.search.substring_score;

        documents
            .iter()
            .enumerate()
            .filter(|(_, document)| {
                contains_ignore_case(&document.content, &needle)
                    || contains_ignore_case(&document.title, &needle)
            })
            .map(|(index, _)| (index, score))
            .collect()
    }
}

/// Sort by similarity descending, ties by original position, then cap.
fn rank(mut scored: Vec<(usize, f32)>, limit: usize) -> Vec<(usize, f32)> {
    scored.sort_by_key(|&(index, similarity)| (Reverse(OrderedFloat(similarity)), index));
    scored.truncate(limit);
    scored
}

fn contains_ignore_case(haystack: &str, lowercase_needle: &str) -> bool {
    let collapsed = haystack.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase().contains(lowercase_needle)
}

fn provider_from_config(config: &RetrievalConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedding = &config.embedding;
    let provider: Arc<dyn EmbeddingProvider> = match embedding.provider {
        EmbeddingProviderType::OpenAI => {
            let mut provider = OpenAIProvider::new().with_dimension(embedding.dimension);
            if let Some(model) = &embedding.model {
                provider = provider.with_model(model.clone());
            }
            if let Some(base_url) = &embedding.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Arc::new(provider)
        }
        EmbeddingProviderType::Fallback => Arc::new(
            FallbackEmbedder::new(embedding.dimension)?
                .with_max_input_chars(embedding.max_input_chars),
        ),
    };
    Ok(provider)
}

/// Builder for [`SemanticSearch`].
pub struct SemanticSearchBuilder {
    config: RetrievalConfig,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl SemanticSearchBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RetrievalConfig::default(),
            provider: None,
        }
    }

    /// Use the given configuration.
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject a provider instead of building one from the configuration.
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.config.embedding.dimension = dimension;
        self
    }

    /// Set the provider timeout in milliseconds.
    pub fn with_provider_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.embedding.provider_timeout_ms = timeout_ms;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<SemanticSearch> {
        match self.provider {
            Some(provider) => SemanticSearch::new(provider, self.config),
            None => SemanticSearch::from_config(self.config),
        }
    }
}

impl Default for SemanticSearchBuilder {
    fn default() -> Self {
        Self::new()
    }
}
