//! # Chessmate Hybrid Executor
//!
//! Coordinates the SQL candidate fetch, vector-store search, optional
//! LLM re-ranking stage, and score fusion into a single
//! `chessmate_protocol::ExecutionOutput` (spec.md §4.6). This is the
//! crate the HTTP surface calls once the intent analyzer has turned a
//! question into a `QueryPlan`.

mod error;
mod executor;
mod fusion;

pub use error::{HybridError, Result};
pub use executor::{AgentStage, HybridConfig, HybridExecutor};
pub use fusion::{
    base_total, combine_with_agent, count_matched_filters, keyword_score, rating_matches, tokenize_summary,
    vector_score,
};
