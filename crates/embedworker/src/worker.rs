use crate::backoff::backoff_delay;
use crate::batching::{split_into_batches, BatchItem};
use crate::error::EmbedWorkerError;
use crate::health::WorkerHealth;
use crate::queue::{ClaimedJob, EmbeddingJobQueue};
use crate::upsert::{UpsertPoint, VectorUpserter};
use chessmate_protocol::sanitize;
use chessmate_vector::EmbeddingProvider;
use std::sync::Arc;
use std::time::Duration;

/// Tunables named in spec.md §4.7.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub batch_size: usize,
    pub max_batch_count: usize,
    pub max_chars_per_request: usize,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub max_job_attempts: u32,
    pub poll_sleep: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: "embedworker-0".to_string(),
            batch_size: 50,
            max_batch_count: 16,
            max_chars_per_request: 8_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            max_job_attempts: 5,
            poll_sleep: Duration::from_secs(5),
        }
    }
}

/// Drains the `embedding_jobs` queue, keeping the vector store in sync
/// with relational rows (spec.md §4.7). Multiple workers may run
/// concurrently against the same queue; atomicity of the claim step is
/// the [`EmbeddingJobQueue`] implementation's responsibility.
pub struct EmbeddingWorker {
    config: WorkerConfig,
    queue: Arc<dyn EmbeddingJobQueue>,
    provider: Arc<dyn EmbeddingProvider>,
    upserter: Arc<dyn VectorUpserter>,
    health: Arc<WorkerHealth>,
}

impl EmbeddingWorker {
    #[must_use]
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn EmbeddingJobQueue>,
        provider: Arc<dyn EmbeddingProvider>,
        upserter: Arc<dyn VectorUpserter>,
    ) -> Self {
        Self {
            config,
            queue,
            provider,
            upserter,
            health: Arc::new(WorkerHealth::default()),
        }
    }

    #[must_use]
    pub fn health(&self) -> Arc<WorkerHealth> {
        self.health.clone()
    }

    /// Runs the claim/embed/upsert loop until `max_empty_polls`
    /// consecutive empty claims (spec.md §4.7 step 2 "optionally exit
    /// after N consecutive empty polls"). Pass `None` to loop forever
    /// (the production entrypoint's mode).
    pub async fn run(&self, max_empty_polls: Option<u32>) {
        let mut empty_polls = 0u32;
        loop {
            let processed = self.run_once().await;
            self.health.record_poll();

            if processed == 0 {
                empty_polls += 1;
                if let Some(limit) = max_empty_polls {
                    if empty_polls >= limit {
                        log::info!("worker {} exiting after {empty_polls} consecutive empty polls", self.config.worker_id);
                        return;
                    }
                }
                tokio::time::sleep(self.config.poll_sleep).await;
            } else {
                empty_polls = 0;
            }
        }
    }

    /// One claim-embed-upsert cycle (spec.md §4.7 steps 1, 3-7). Returns
    /// the number of jobs claimed, so [`Self::run`] can detect an empty
    /// poll without a second queue round-trip.
    pub async fn run_once(&self) -> usize {
        let claimed = match self.queue.claim_batch(self.config.batch_size, &self.config.worker_id).await {
            Ok(claimed) => claimed,
            Err(err) => {
                log::warn!("{}", sanitize(&format!("job claim failed: {err}")));
                return 0;
            }
        };

        if claimed.is_empty() {
            return 0;
        }

        let items: Vec<BatchItem> = claimed
            .iter()
            .map(|c| BatchItem {
                job_id: c.job.id,
                text: c.job.fen.clone(),
            })
            .collect();
        let batches = split_into_batches(items, self.config.max_batch_count, self.config.max_chars_per_request);

        let jobs_by_id: std::collections::HashMap<i64, &ClaimedJob> = claimed.iter().map(|c| (c.job.id, c)).collect();

        for batch in batches {
            self.process_batch(&batch, &jobs_by_id).await;
        }

        claimed.len()
    }

    async fn process_batch(&self, batch: &[BatchItem], jobs_by_id: &std::collections::HashMap<i64, &ClaimedJob>) {
        match self.embed_with_retry(batch).await {
            Ok(vectors) => {
                let points: Vec<UpsertPoint> = batch
                    .iter()
                    .zip(vectors)
                    .filter_map(|(item, vector)| {
                        jobs_by_id.get(&item.job_id).map(|claimed| UpsertPoint {
                            job_id: item.job_id,
                            fen: item.text.clone(),
                            vector,
                            metadata: claimed.metadata.clone(),
                        })
                    })
                    .collect();

                match self.upserter.upsert(&points).await {
                    Ok(vector_ids) => {
                        for (point, vector_id) in points.iter().zip(vector_ids) {
                            if let Err(err) = self.queue.mark_completed(point.job_id, &vector_id).await {
                                log::warn!("{}", sanitize(&format!("failed to mark job {} completed: {err}", point.job_id)));
                            }
                        }
                        self.health.record_processed(points.len() as u64);
                    }
                    Err(err) => {
                        let transient = err.is_transient();
                        self.fail_batch(batch, jobs_by_id, &format!("vector store upsert failed: {err}"), transient)
                            .await;
                    }
                }
            }
            Err(err) => {
                let transient = err.is_transient();
                self.fail_batch(batch, jobs_by_id, &format!("embedding failed: {err}"), transient).await;
            }
        }
    }

    /// Records a failed attempt for every job in `batch`. `transient`
    /// reflects the underlying error: a non-transient error (bad auth,
    /// malformed input) is terminal on its first occurrence regardless
    /// of how many attempts the job has left, per spec.md §4.7
    /// "Failure" ("go straight to failed after one attempt").
    async fn fail_batch(
        &self,
        batch: &[BatchItem],
        jobs_by_id: &std::collections::HashMap<i64, &ClaimedJob>,
        message: &str,
        transient: bool,
    ) {
        let sanitized = sanitize(message);
        log::warn!("{sanitized}");
        self.health.record_failed(batch.len() as u64);
        for item in batch {
            let Some(claimed) = jobs_by_id.get(&item.job_id) else { continue };
            let terminal = !transient || claimed.job.attempts + 1 >= self.config.max_job_attempts;
            if let Err(err) = self.queue.record_attempt_failure(item.job_id, &sanitized, terminal).await {
                log::warn!("{}", sanitize(&format!("failed to record failure for job {}: {err}", item.job_id)));
            }
        }
    }

    /// spec.md §4.7 step 4: exponential backoff on transient transport
    /// errors; non-transient failures (bad auth, malformed input) are
    /// not retried here — they are handed to [`Self::fail_batch`]
    /// straight away by the caller's single attempt.
    async fn embed_with_retry(&self, batch: &[BatchItem]) -> crate::error::Result<Vec<Vec<f32>>> {
        let inputs: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
        let mut last_error = EmbedWorkerError::Embedding("no attempt made".to_string());

        for attempt in 0..=self.config.retry_max_attempts {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt - 1, self.config.retry_base_delay_ms)).await;
            }

            match self.provider.embed(&inputs).await {
                Ok(vectors) if vectors.len() == inputs.len() => return Ok(vectors),
                Ok(vectors) => {
                    last_error = EmbedWorkerError::Embedding(format!(
                        "embedding provider returned {} vectors for {} inputs",
                        vectors.len(),
                        inputs.len()
                    ));
                    return Err(last_error);
                }
                Err(err) => {
                    last_error = EmbedWorkerError::Embedding(err.to_string());
                    if !last_error.is_transient() {
                        return Err(last_error);
                    }
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryJobQueue, PositionMetadata};
    use crate::upsert::{FailingVectorUpserter, InMemoryVectorUpserter};
    use chessmate_protocol::EmbeddingJob;
    use chessmate_vector::InMemoryEmbeddingProvider;

    /// Always returns a 401-shaped error, so `EmbedWorkerError::is_transient`
    /// classifies it as non-transient (bad auth).
    struct UnauthorizedEmbeddingProvider;

    #[async_trait::async_trait]
    impl chessmate_vector::EmbeddingProvider for UnauthorizedEmbeddingProvider {
        async fn embed(&self, _inputs: &[String]) -> chessmate_vector::Result<Vec<Vec<f32>>> {
            Err(chessmate_vector::VectorError::Embedding("status 401 unauthorized".to_string()))
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn job(id: i64) -> (EmbeddingJob, PositionMetadata) {
        (
            EmbeddingJob::new(id, id, format!("8/8/8/8/8/8/8/{id}K w - - 0 1")),
            PositionMetadata {
                game_id: id,
                white: "Alpha".into(),
                black: "Beta".into(),
                opening_slug: Some("sicilian_defense".into()),
                phases: vec!["middlegame".into()],
                themes: vec![],
                keywords: vec![],
            },
        )
    }

    #[tokio::test]
    async fn run_once_with_empty_queue_returns_zero() {
        let queue = Arc::new(InMemoryJobQueue::default());
        let worker = EmbeddingWorker::new(
            WorkerConfig::default(),
            queue,
            Arc::new(InMemoryEmbeddingProvider::new(8)),
            Arc::new(InMemoryVectorUpserter::default()),
        );
        assert_eq!(worker.run_once().await, 0);
    }

    #[tokio::test]
    async fn run_once_completes_jobs_on_success() {
        let queue = Arc::new(InMemoryJobQueue::new(vec![job(1), job(2)]));
        let upserter = Arc::new(InMemoryVectorUpserter::default());
        let worker = EmbeddingWorker::new(
            WorkerConfig::default(),
            queue.clone(),
            Arc::new(InMemoryEmbeddingProvider::new(8)),
            upserter.clone(),
        );

        let processed = worker.run_once().await;
        assert_eq!(processed, 2);

        let snapshot = queue.snapshot();
        assert!(snapshot.iter().all(|j| j.status == chessmate_protocol::JobStatus::Completed));
        assert_eq!(upserter.upserted.lock().len(), 2);
        assert_eq!(worker.health().snapshot().processed_total, 2);
    }

    #[tokio::test]
    async fn upsert_failure_returns_job_to_pending_below_attempt_threshold() {
        let queue = Arc::new(InMemoryJobQueue::new(vec![job(1)]));
        let mut config = WorkerConfig::default();
        config.retry_max_attempts = 0;
        config.max_job_attempts = 5;

        let worker = EmbeddingWorker::new(
            config,
            queue.clone(),
            Arc::new(InMemoryEmbeddingProvider::new(8)),
            Arc::new(FailingVectorUpserter),
        );

        worker.run_once().await;

        let snapshot = queue.snapshot();
        assert_eq!(snapshot[0].status, chessmate_protocol::JobStatus::Pending);
        assert_eq!(snapshot[0].attempts, 1);
        assert_eq!(worker.health().snapshot().failed_total, 1);
    }

    #[tokio::test]
    async fn non_transient_embedding_error_fails_terminally_on_first_attempt() {
        let queue = Arc::new(InMemoryJobQueue::new(vec![job(1)]));
        let mut config = WorkerConfig::default();
        config.retry_max_attempts = 3;
        config.max_job_attempts = 5;

        let worker = EmbeddingWorker::new(
            config,
            queue.clone(),
            Arc::new(UnauthorizedEmbeddingProvider),
            Arc::new(InMemoryVectorUpserter::default()),
        );

        worker.run_once().await;

        let snapshot = queue.snapshot();
        assert_eq!(snapshot[0].status, chessmate_protocol::JobStatus::Failed);
        assert_eq!(snapshot[0].attempts, 1);
    }

    #[tokio::test]
    async fn job_fails_terminally_once_attempt_threshold_is_reached() {
        let (mut eligible_job, metadata) = job(1);
        eligible_job.attempts = 4;
        let queue = Arc::new(InMemoryJobQueue::new(vec![(eligible_job, metadata)]));
        let mut config = WorkerConfig::default();
        config.retry_max_attempts = 0;
        config.max_job_attempts = 5;

        let worker = EmbeddingWorker::new(
            config,
            queue.clone(),
            Arc::new(InMemoryEmbeddingProvider::new(8)),
            Arc::new(FailingVectorUpserter),
        );

        worker.run_once().await;
        assert_eq!(queue.snapshot()[0].status, chessmate_protocol::JobStatus::Failed);
    }

    #[tokio::test]
    async fn run_exits_after_configured_empty_polls() {
        let queue = Arc::new(InMemoryJobQueue::default());
        let mut config = WorkerConfig::default();
        config.poll_sleep = Duration::from_millis(1);
        let worker = EmbeddingWorker::new(
            config,
            queue,
            Arc::new(InMemoryEmbeddingProvider::new(8)),
            Arc::new(InMemoryVectorUpserter::default()),
        );

        worker.run(Some(2)).await;
    }
}
