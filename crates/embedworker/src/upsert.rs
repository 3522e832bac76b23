use crate::error::{EmbedWorkerError, Result};
use crate::queue::PositionMetadata;
use async_trait::async_trait;
use std::time::Duration;

/// One point ready to be written to the vector store, pairing a claimed
/// job's embedding with the relational metadata it carries as payload
/// (spec.md §4.7 step 5).
#[derive(Debug, Clone)]
pub struct UpsertPoint {
    pub job_id: i64,
    pub fen: String,
    pub vector: Vec<f32>,
    pub metadata: PositionMetadata,
}

/// The worker's write-side counterpart to `chessmate_vector::VectorSearchClient`.
/// Kept as a separate trait since search and ingestion are different
/// capabilities with different failure semantics, generalized from
/// `crates/vector-store/src/store.rs`'s insert path (there: in-process,
/// keyed by chunk id; here: an HTTP upsert keyed by job id).
#[async_trait]
pub trait VectorUpserter: Send + Sync {
    /// Returns the vector store's assigned id for each point, in the
    /// same order as `points`.
    async fn upsert(&self, points: &[UpsertPoint]) -> Result<Vec<String>>;
}

pub struct HttpVectorUpserter {
    client: reqwest::Client,
    base_url: String,
    collection: String,
}

impl HttpVectorUpserter {
    #[must_use]
    pub fn new(base_url: impl Into<String>, collection: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl VectorUpserter for HttpVectorUpserter {
    async fn upsert(&self, points: &[UpsertPoint]) -> Result<Vec<String>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/collections/{}/points",
            self.base_url.trim_end_matches('/'),
            self.collection
        );

        let wire_points: Vec<serde_json::Value> = points
            .iter()
            .map(|point| {
                let id = format!("job-{}", point.job_id);
                serde_json::json!({
                    "id": id,
                    "vector": point.vector,
                    "payload": {
                        "game_id": point.metadata.game_id,
                        "fen": point.fen,
                        "white": point.metadata.white,
                        "black": point.metadata.black,
                        "opening_slug": point.metadata.opening_slug,
                        "phases": point.metadata.phases,
                        "themes": point.metadata.themes,
                        "keywords": point.metadata.keywords,
                    },
                })
            })
            .collect();

        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({"points": wire_points}))
            .send()
            .await
            .map_err(|err| EmbedWorkerError::Upsert(err.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbedWorkerError::Upsert(format!(
                "vector store returned status {}",
                response.status()
            )));
        }

        Ok(points.iter().map(|point| format!("job-{}", point.job_id)).collect())
    }
}

/// In-memory fake for deterministic tests.
#[derive(Default)]
pub struct InMemoryVectorUpserter {
    pub upserted: parking_lot::Mutex<Vec<UpsertPoint>>,
}

#[async_trait]
impl VectorUpserter for InMemoryVectorUpserter {
    async fn upsert(&self, points: &[UpsertPoint]) -> Result<Vec<String>> {
        let ids = points.iter().map(|point| format!("job-{}", point.job_id)).collect();
        self.upserted.lock().extend_from_slice(points);
        Ok(ids)
    }
}

/// Always-fails fake, useful for exercising the retry/backoff path.
pub struct FailingVectorUpserter;

#[async_trait]
impl VectorUpserter for FailingVectorUpserter {
    async fn upsert(&self, _points: &[UpsertPoint]) -> Result<Vec<String>> {
        Err(EmbedWorkerError::Upsert("connection refused".to_string()))
    }
}
