use crate::error::{Result, VectorError};
use crate::fallback::hash_fallback_vector;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Embeds text into a fixed-dimension vector. Production adapters call
/// out to a real embedding API; the embedding worker (spec.md §4.7) and
/// the hybrid executor's query-vector step (§4.6 step 2) both depend on
/// this trait rather than any one provider's wire shape.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;
}

/// Calls an OpenAI-shaped `POST /embeddings` endpoint. Request/response
/// framing follows `examples/elisplash-paw/src-tauri/src/engine/providers/openai.rs`'s
/// `reqwest::Client` usage (bearer auth, JSON body, connect/overall
/// timeouts); the embeddings wire protocol itself is out of scope per
/// spec.md §1.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": inputs,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| VectorError::Embedding(err.to_string()))?;

        if !response.status().is_success() {
            return Err(VectorError::Embedding(format!(
                "embedding provider returned status {}",
                response.status()
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| VectorError::Embedding(err.to_string()))?;

        if parsed.data.len() != inputs.len() {
            return Err(VectorError::Embedding(format!(
                "embedding provider returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|datum| datum.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic in-memory fake for tests: embeds by hashing the input
/// text, so it is reproducible without a network call.
pub struct InMemoryEmbeddingProvider {
    dimension: usize,
}

impl InMemoryEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for InMemoryEmbeddingProvider {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs
            .iter()
            .map(|text| hash_fallback_vector(text, self.dimension))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Always-fails provider, useful for exercising the fallback path in
/// tests without standing up a broken HTTP server.
pub struct DeterministicFallbackProvider {
    dimension: usize,
}

impl DeterministicFallbackProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for DeterministicFallbackProvider {
    async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(VectorError::Embedding("embedding provider unavailable".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Outcome of computing the query vector for the hybrid executor's
/// vector-search step (spec.md §4.6 step 2): either a real embedding, or
/// the deterministic hash fallback with a warning attached.
pub enum QueryVectorOutcome {
    Embedded(Vec<f32>),
    Fallback { vector: Vec<f32>, warning: String },
}

impl QueryVectorOutcome {
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        match self {
            QueryVectorOutcome::Embedded(v) | QueryVectorOutcome::Fallback { vector: v, .. } => v,
        }
    }

    #[must_use]
    pub fn warning(&self) -> Option<&str> {
        match self {
            QueryVectorOutcome::Embedded(_) => None,
            QueryVectorOutcome::Fallback { warning, .. } => Some(warning.as_str()),
        }
    }
}

/// Extension point named by spec.md §9's open question: query-side
/// embeddings are not used for semantic re-ranking today, only to drive
/// the vector-store's point search. A future semantic-rerank mode can
/// implement this trait without reshaping `HybridExecutor`.
#[async_trait]
pub trait QueryVectorStrategy: Send + Sync {
    async fn compute(&self, text: &str) -> QueryVectorOutcome;
}

/// Default strategy: try the real embedding provider, fall back to the
/// deterministic hash vector on any error (spec.md §9).
pub struct ProviderOrFallback<'a> {
    provider: &'a dyn EmbeddingProvider,
}

impl<'a> ProviderOrFallback<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn EmbeddingProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<'a> QueryVectorStrategy for ProviderOrFallback<'a> {
    async fn compute(&self, text: &str) -> QueryVectorOutcome {
        match self.provider.embed(std::slice::from_ref(&text.to_string())).await {
            Ok(mut vectors) if !vectors.is_empty() => QueryVectorOutcome::Embedded(vectors.remove(0)),
            Ok(_) => QueryVectorOutcome::Fallback {
                vector: hash_fallback_vector(text, self.provider.dimension()),
                warning: "embedding provider returned no vectors; used fallback".to_string(),
            },
            Err(err) => QueryVectorOutcome::Fallback {
                vector: hash_fallback_vector(text, self.provider.dimension()),
                warning: format!("embedding provider unavailable ({err}); used fallback vector"),
            },
        }
    }
}

/// Owned counterpart to [`ProviderOrFallback`]: holds an `Arc` instead of
/// a borrow, so it can be stored behind `Arc<dyn QueryVectorStrategy>`
/// for the lifetime of the process (the production wiring in the CLI
/// entrypoint needs this; the borrowed form is only convenient in tests
/// that already have a provider on the stack).
pub struct OwnedProviderOrFallback {
    provider: std::sync::Arc<dyn EmbeddingProvider>,
}

impl OwnedProviderOrFallback {
    #[must_use]
    pub fn new(provider: std::sync::Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl QueryVectorStrategy for OwnedProviderOrFallback {
    async fn compute(&self, text: &str) -> QueryVectorOutcome {
        ProviderOrFallback::new(self.provider.as_ref()).compute(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_provider_is_deterministic() {
        let provider = InMemoryEmbeddingProvider::new(8);
        let a = provider.embed(&["sicilian".to_string()]).await.unwrap();
        let b = provider.embed(&["sicilian".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn empty_input_embeds_to_empty_output() {
        let provider = InMemoryEmbeddingProvider::new(8);
        assert!(provider.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_or_fallback_falls_back_on_error() {
        let provider = DeterministicFallbackProvider::new(8);
        let strategy = ProviderOrFallback::new(&provider);
        let outcome = strategy.compute("king attack").await;
        assert!(matches!(outcome, QueryVectorOutcome::Fallback { .. }));
        assert_eq!(outcome.vector().len(), 8);
        assert!(outcome.warning().is_some());
    }

    #[tokio::test]
    async fn provider_or_fallback_uses_embedding_on_success() {
        let provider = InMemoryEmbeddingProvider::new(8);
        let strategy = ProviderOrFallback::new(&provider);
        let outcome = strategy.compute("king attack").await;
        assert!(matches!(outcome, QueryVectorOutcome::Embedded(_)));
        assert!(outcome.warning().is_none());
    }
}
