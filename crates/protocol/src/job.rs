use serde::{Deserialize, Serialize};

/// Lifecycle status of an embedding job (spec.md §3): created on ingest,
/// claimed (`in_progress`), then terminal (`completed`/`failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One row of the `embedding_jobs` queue the worker drains (spec.md §4.7
/// and §6 "Embedding job record").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingJob {
    pub id: i64,
    pub position_id: i64,
    pub fen: String,
    pub status: JobStatus,
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub vector_id: Option<String>,
}

impl EmbeddingJob {
    #[must_use]
    pub fn new(id: i64, position_id: i64, fen: impl Into<String>) -> Self {
        Self {
            id,
            position_id,
            fen: fen.into(),
            status: JobStatus::Pending,
            attempts: 0,
            last_error: None,
            vector_id: None,
        }
    }
}
