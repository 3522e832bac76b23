//! # Chessmate HTTP Surface
//!
//! Wires the intent analyzer, rate limiter, and hybrid executor to the
//! three routes spec.md §6 names: `/query`, `/health`, `/metrics`. The
//! CLI entrypoint owns configuration loading and process lifecycle; this
//! crate owns request/response shaping and admission control.

mod cache;
mod error;
pub mod health;
mod metrics;
mod query;
mod router;
mod state;

pub use cache::MetricsAgentCache;
pub use error::{Result, ServerError};
pub use metrics::ServerMetrics;
pub use query::{GetQueryParams, QueryBody, QueryResponse, ResultView};
pub use router::build_router;
pub use state::AppState;
