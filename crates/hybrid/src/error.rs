use thiserror::Error;

pub type Result<T> = std::result::Result<T, HybridError>;

/// Per spec.md §7 "Internal (5xx): SQL failure (fatal for that
/// request)" — the only failure mode that aborts a query outright.
/// Vector-store, agent, and cache failures are recoverable and never
/// appear here; they surface as warnings on a successful
/// [`chessmate_protocol::ExecutionOutput`].
#[derive(Error, Debug)]
pub enum HybridError {
    #[error("candidate retrieval failed: {0}")]
    Sql(String),
}
