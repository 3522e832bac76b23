//! # Chessmate Embedding Worker
//!
//! Drains the `embedding_jobs` queue and keeps the vector store's
//! position embeddings in sync with the relational `games`/`positions`
//! tables (spec.md §4.7). Runs as one or more background tasks
//! alongside the query-serving HTTP surface.

mod backoff;
mod batching;
mod error;
mod health;
mod queue;
mod upsert;
mod worker;

pub use backoff::backoff_delay;
pub use batching::{split_into_batches, BatchItem};
pub use error::{EmbedWorkerError, Result};
pub use health::{WorkerHealth, WorkerHealthSnapshot};
pub use queue::{ClaimedJob, EmbeddingJobQueue, InMemoryJobQueue, PgEmbeddingJobQueue, PositionMetadata};
pub use upsert::{FailingVectorUpserter, HttpVectorUpserter, InMemoryVectorUpserter, UpsertPoint, VectorUpserter};
pub use worker::{EmbeddingWorker, WorkerConfig};
