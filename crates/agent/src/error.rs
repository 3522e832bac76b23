use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Every reason the evaluator call can fail (spec.md §4.5 "Failure").
/// The executor turns any of these into a breaker failure.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("agent call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("agent API returned status {0}: {1}")]
    Status(u16, String),

    #[error("agent response violated the evaluation schema: {0}")]
    Schema(String),

    #[error("agent response contained no usable evaluations")]
    Empty,
}
