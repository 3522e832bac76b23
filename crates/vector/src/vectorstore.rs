use crate::error::{Result, VectorError};
use crate::payload::PayloadFilter;
use async_trait::async_trait;
use chessmate_protocol::VectorHit;
use serde::Deserialize;
use std::time::Duration;

/// The vector-store wire protocol is out of scope (spec.md §1), but the
/// capability trait and an HTTP adapter are not (spec.md §9
/// "Polymorphism"). `fetch_vector_hits` must never panic; transport
/// failures surface as [`VectorError::VectorStore`] so the hybrid
/// executor can downgrade to a warning rather than fail the request.
#[async_trait]
pub trait VectorSearchClient: Send + Sync {
    async fn fetch_vector_hits(
        &self,
        vector: &[f32],
        filter: &PayloadFilter,
        limit: usize,
    ) -> Result<Vec<VectorHit>>;
}

/// Calls a Qdrant-shaped `POST /collections/{name}/points/search`,
/// generalized from `crates/vector-store/src/store.rs`'s
/// `search`/`search_batch` method shapes (there: in-process cosine
/// search over code chunks; here: an HTTP point search over payload-
/// filtered chess positions).
pub struct HttpVectorSearchClient {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpVectorSearchClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            collection: collection.into(),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchPoint>,
}

#[derive(Deserialize)]
struct SearchPoint {
    score: f32,
    payload: PointPayload,
}

#[derive(Deserialize, Default)]
struct PointPayload {
    game_id: i64,
    #[serde(default)]
    phases: Vec<String>,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

fn filter_to_json(filter: &PayloadFilter) -> serde_json::Value {
    let mut must: Vec<serde_json::Value> = filter
        .must
        .iter()
        .flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| serde_json::json!({"key": key, "match": {"value": value}}))
        })
        .collect();
    if let Some(min) = filter.min_white_rating {
        must.push(serde_json::json!({"key": "white_rating", "range": {"gte": min}}));
    }
    if let Some(min) = filter.min_black_rating {
        must.push(serde_json::json!({"key": "black_rating", "range": {"gte": min}}));
    }
    serde_json::json!({"must": must})
}

#[async_trait]
impl VectorSearchClient for HttpVectorSearchClient {
    async fn fetch_vector_hits(
        &self,
        vector: &[f32],
        filter: &PayloadFilter,
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url.trim_end_matches('/'),
            self.collection
        );
        let body = serde_json::json!({
            "vector": vector,
            "filter": filter_to_json(filter),
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| VectorError::VectorStore(err.to_string()))?;

        if !response.status().is_success() {
            return Err(VectorError::VectorStore(format!(
                "vector store returned status {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|err| VectorError::VectorStore(err.to_string()))?;

        Ok(parsed
            .result
            .into_iter()
            .map(|point| VectorHit {
                game_id: point.payload.game_id,
                score: point.score,
                phases: point.payload.phases,
                themes: point.payload.themes,
                keywords: point.payload.keywords,
            })
            .collect())
    }
}

/// In-memory fake for deterministic tests (spec.md §9).
#[derive(Default)]
pub struct InMemoryVectorSearchClient {
    hits: Vec<VectorHit>,
}

impl InMemoryVectorSearchClient {
    #[must_use]
    pub fn new(hits: Vec<VectorHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl VectorSearchClient for InMemoryVectorSearchClient {
    async fn fetch_vector_hits(
        &self,
        _vector: &[f32],
        _filter: &PayloadFilter,
        limit: usize,
    ) -> Result<Vec<VectorHit>> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fake_client_respects_limit() {
        let client = InMemoryVectorSearchClient::new(vec![
            VectorHit {
                game_id: 1,
                score: 0.9,
                phases: vec![],
                themes: vec![],
                keywords: vec![],
            },
            VectorHit {
                game_id: 2,
                score: 0.8,
                phases: vec![],
                themes: vec![],
                keywords: vec![],
            },
        ]);
        let hits = client
            .fetch_vector_hits(&[0.1, 0.2], &PayloadFilter::default(), 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].game_id, 1);
    }
}
