//! # Chessmate Protocol
//!
//! Shared domain types that flow between the intent analyzer, the hybrid
//! executor, the agent evaluator, and the HTTP surface. Nothing in this
//! crate performs I/O; it is the vocabulary the rest of the workspace
//! speaks.

mod error;
mod execution;
mod game;
mod job;
mod plan;
mod sanitize;

pub use error::ErrorEnvelope;
pub use execution::{AgentStatus, ExecutionOutput, RankedResult};
pub use game::{AgentEvaluation, GameSummary, VectorHit};
pub use job::{EmbeddingJob, JobStatus};
pub use plan::{Filter, FilterField, QueryPlan, QueryRequest, Rating, DEFAULT_LIMIT, MAX_LIMIT};
pub use sanitize::sanitize;
