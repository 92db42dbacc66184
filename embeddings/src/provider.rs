//! Embedding providers.
//!
//! The [`EmbeddingProvider`] trait is the seam between the search engine and
//! whatever produces vectors. [`OpenAIProvider`] talks to any OpenAI-compatible
//! `/embeddings` endpoint; [`crate::FallbackEmbedder`] implements the same
//! trait without touching the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};

/// Request for generating embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Text to embed.
    pub text: String,

    /// Model to use (provider-specific).
    pub model: Option<String>,

    /// Dimensions for the output (if supported by provider).
    pub dimensions: Option<usize>,
}

impl EmbeddingRequest {
    /// Create a new embedding request.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            dimensions: None,
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

/// Response from embedding generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The generated embedding.
    pub embedding: Embedding,

    /// Model used to generate the embedding.
    pub model: String,

    /// Dimension of the embedding.
    pub dimension: usize,

    /// Token usage (if available).
    pub tokens_used: Option<u64>,
}

/// Trait for embedding providers.
///
/// Implementations must only be called with non-empty, normalized text.
/// Any failure is treated by callers as "provider unavailable"; see
/// [`EmbeddingError::is_provider_unavailable`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the default embedding dimension.
    fn default_dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        // Default implementation: process sequentially
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.embed(request).await?);
        }
        Ok(results)
    }

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool;
}

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Default model.
    default_model: String,

    /// Width every returned vector must have, when pinned.
    expected_dimension: Option<usize>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider, reading the key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            default_model: "text-embedding-3-small".to_string(),
            expected_dimension: None,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Drop any configured API key.
    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Request and enforce a fixed output width.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(EmbeddingError::ProviderNotConfigured)
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        match self.expected_dimension {
            Some(expected) if expected != embedding.len() => {
                Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn post(&self, body: serde_json::Value) -> Result<OpenAIEmbeddingResponse> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "API error ({status}): {error_text}"
            )));
        }

        Ok(response.json().await?)
    }

    fn request_body(&self, input: serde_json::Value, model: &str, dims: Option<usize>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "input": input,
            "model": model
        });

        if let Some(dims) = dims.or(self.expected_dimension) {
            body["dimensions"] = serde_json::json!(dims);
        }

        body
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn default_dimension(&self) -> usize {
        if let Some(dimension) = self.expected_dimension {
            return dimension;
        }
        match self.default_model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse> {
        if request.text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let model = request.model.unwrap_or_else(|| self.default_model.clone());

        debug!("Generating embedding with model: {model}");

        let body = self.request_body(serde_json::json!(request.text), &model, request.dimensions);
        let result = self.post(body).await?;

        let embedding = result
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))?
            .embedding;
        self.check_dimension(&embedding)?;

        let dimension = embedding.len();
        let tokens_used = result.usage.map(|u| u.total_tokens);

        debug!("Generated embedding with {dimension} dimensions");

        Ok(EmbeddingResponse {
            embedding,
            model: result.model,
            dimension,
            tokens_used,
        })
    }

    async fn embed_batch(&self, requests: Vec<EmbeddingRequest>) -> Result<Vec<EmbeddingResponse>> {
        let Some(first) = requests.first() else {
            return Ok(Vec::new());
        };

        let model = first
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let dims = first.dimensions;

        let texts: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();

        debug!(
            "Generating batch embeddings for {} texts with model: {model}",
            texts.len()
        );

        let body = self.request_body(serde_json::json!(texts), &model, dims);
        let mut result = self.post(body).await?;

        if result.data.len() != requests.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                requests.len(),
                result.data.len()
            )));
        }

        // The API may answer out of order; `index` refers to the input position.
        result.data.sort_by_key(|item| item.index);

        let mut responses = Vec::with_capacity(result.data.len());
        for item in result.data {
            self.check_dimension(&item.embedding)?;
            let dimension = item.embedding.len();
            responses.push(EmbeddingResponse {
                embedding: item.embedding,
                model: result.model.clone(),
                dimension,
                tokens_used: None,
            });
        }

        info!("Generated {} batch embeddings", responses.len());

        Ok(responses)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    total_tokens: u64,
}
