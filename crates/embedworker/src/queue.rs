use crate::error::{EmbedWorkerError, Result};
use async_trait::async_trait;
use chessmate_protocol::{EmbeddingJob, JobStatus};
use parking_lot::Mutex;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::collections::HashMap;

/// Relational metadata needed to build the vector-store payload
/// alongside the claimed job's embedding text (spec.md §4.7 step 5:
/// `{game_id, fen, white, black, opening_slug, phases, themes,
/// keywords}`). `EmbeddingJob` itself only carries the queue's own
/// bookkeeping columns (spec.md §6 "Embedding job record"); this is the
/// join the production queue performs to assemble the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionMetadata {
    pub game_id: i64,
    pub white: String,
    pub black: String,
    pub opening_slug: Option<String>,
    pub phases: Vec<String>,
    pub themes: Vec<String>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub job: EmbeddingJob,
    pub metadata: PositionMetadata,
}

/// The `embedding_jobs` queue (spec.md §4.7/§6). `claim_batch` is the
/// one operation that must be atomic across workers: the production
/// adapter expresses it as a single `UPDATE ... RETURNING` so two
/// workers never observe the same row in `in_progress`.
#[async_trait]
pub trait EmbeddingJobQueue: Send + Sync {
    async fn claim_batch(&self, batch_size: usize, worker_id: &str) -> Result<Vec<ClaimedJob>>;
    async fn mark_completed(&self, job_id: i64, vector_id: &str) -> Result<()>;
    /// Increment `attempts` and record `last_error`; the caller decides
    /// whether the job goes back to `pending` or straight to `failed`.
    async fn record_attempt_failure(&self, job_id: i64, error: &str, terminal: bool) -> Result<()>;
    async fn pending_count(&self) -> Result<usize>;
}

pub struct PgEmbeddingJobQueue {
    pool: PgPool,
    max_attempts: u32,
}

impl PgEmbeddingJobQueue {
    #[must_use]
    pub fn new(pool: PgPool, max_attempts: u32) -> Self {
        Self { pool, max_attempts }
    }
}

#[async_trait]
impl EmbeddingJobQueue for PgEmbeddingJobQueue {
    async fn claim_batch(&self, batch_size: usize, worker_id: &str) -> Result<Vec<ClaimedJob>> {
        let rows = sqlx::query(
            "UPDATE embedding_jobs SET status = 'in_progress', updated_at = now(), worker_id = $1 \
             WHERE id IN ( \
                 SELECT id FROM embedding_jobs WHERE status = 'pending' \
                 ORDER BY id LIMIT $2 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING id, position_id, fen, attempts, last_error, vector_id, \
                       game_id, white, black, opening_slug, phases, themes, keywords",
        )
        .bind(worker_id)
        .bind(batch_size as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| EmbedWorkerError::Queue(err.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| ClaimedJob {
                job: EmbeddingJob {
                    id: row.try_get("id").unwrap_or_default(),
                    position_id: row.try_get("position_id").unwrap_or_default(),
                    fen: row.try_get("fen").unwrap_or_default(),
                    status: JobStatus::InProgress,
                    attempts: row.try_get::<i32, _>("attempts").unwrap_or_default().max(0) as u32,
                    last_error: row.try_get("last_error").ok(),
                    vector_id: row.try_get("vector_id").ok(),
                },
                metadata: PositionMetadata {
                    game_id: row.try_get("game_id").unwrap_or_default(),
                    white: row.try_get("white").unwrap_or_default(),
                    black: row.try_get("black").unwrap_or_default(),
                    opening_slug: row.try_get("opening_slug").ok(),
                    phases: row.try_get("phases").unwrap_or_default(),
                    themes: row.try_get("themes").unwrap_or_default(),
                    keywords: row.try_get("keywords").unwrap_or_default(),
                },
            })
            .collect())
    }

    async fn mark_completed(&self, job_id: i64, vector_id: &str) -> Result<()> {
        sqlx::query("UPDATE embedding_jobs SET status = 'completed', vector_id = $1, updated_at = now() WHERE id = $2")
            .bind(vector_id)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|err| EmbedWorkerError::Queue(err.to_string()))?;
        Ok(())
    }

    async fn record_attempt_failure(&self, job_id: i64, error: &str, terminal: bool) -> Result<()> {
        let status = if terminal || self.max_attempts == 0 { "failed" } else { "pending" };
        sqlx::query(
            "UPDATE embedding_jobs SET status = $1, attempts = attempts + 1, last_error = $2, \
             updated_at = now() WHERE id = $3",
        )
        .bind(status)
        .bind(error)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(|err| EmbedWorkerError::Queue(err.to_string()))?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM embedding_jobs WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| EmbedWorkerError::Queue(err.to_string()))?;
        let total: i64 = row.try_get("total").map_err(|err| EmbedWorkerError::Queue(err.to_string()))?;
        Ok(total.max(0) as usize)
    }
}

/// In-memory fake for deterministic tests (spec.md §9 "Polymorphism").
/// Claims are serialized under a `parking_lot::Mutex` (no suspension
/// happens while held) so concurrent `run_once` calls in tests never
/// double-claim a row, mirroring the production adapter's row-level
/// atomicity.
#[derive(Default)]
pub struct InMemoryJobQueue {
    rows: Mutex<HashMap<i64, (EmbeddingJob, PositionMetadata)>>,
}

impl InMemoryJobQueue {
    #[must_use]
    pub fn new(jobs: Vec<(EmbeddingJob, PositionMetadata)>) -> Self {
        Self {
            rows: Mutex::new(jobs.into_iter().map(|(job, meta)| (job.id, (job, meta))).collect()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<EmbeddingJob> {
        self.rows.lock().values().map(|(job, _)| job.clone()).collect()
    }
}

#[async_trait]
impl EmbeddingJobQueue for InMemoryJobQueue {
    async fn claim_batch(&self, batch_size: usize, _worker_id: &str) -> Result<Vec<ClaimedJob>> {
        let mut rows = self.rows.lock();
        let mut claimed = Vec::new();
        for (job, metadata) in rows.values_mut() {
            if job.status != JobStatus::Pending {
                continue;
            }
            job.status = JobStatus::InProgress;
            claimed.push(ClaimedJob {
                job: job.clone(),
                metadata: metadata.clone(),
            });
            if claimed.len() >= batch_size {
                break;
            }
        }
        Ok(claimed)
    }

    async fn mark_completed(&self, job_id: i64, vector_id: &str) -> Result<()> {
        let mut rows = self.rows.lock();
        if let Some((job, _)) = rows.get_mut(&job_id) {
            job.status = JobStatus::Completed;
            job.vector_id = Some(vector_id.to_string());
        }
        Ok(())
    }

    async fn record_attempt_failure(&self, job_id: i64, error: &str, terminal: bool) -> Result<()> {
        let mut rows = self.rows.lock();
        if let Some((job, _)) = rows.get_mut(&job_id) {
            job.attempts += 1;
            job.last_error = Some(error.to_string());
            job.status = if terminal { JobStatus::Failed } else { JobStatus::Pending };
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<usize> {
        Ok(self
            .rows
            .lock()
            .values()
            .filter(|(job, _)| job.status == JobStatus::Pending)
            .count())
    }
}
