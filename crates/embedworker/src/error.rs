use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedWorkerError>;

/// Every reason a job can fail a single processing attempt (spec.md
/// §4.7 "Failure"). The worker itself never stops on one of these; it
/// records the reason against the job and moves on.
#[derive(Error, Debug)]
pub enum EmbedWorkerError {
    #[error("job queue error: {0}")]
    Queue(String),

    #[error("embedding provider error: {0}")]
    Embedding(String),

    #[error("vector store upsert error: {0}")]
    Upsert(String),
}

impl EmbedWorkerError {
    /// Non-transient failures (bad auth, malformed input) skip the
    /// retry loop and go straight to `failed`; everything else is
    /// retried with backoff (spec.md §4.7 "Failure").
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            EmbedWorkerError::Queue(_) => true,
            EmbedWorkerError::Embedding(message) => !message.contains("status 401") && !message.contains("status 403"),
            EmbedWorkerError::Upsert(_) => true,
        }
    }
}
