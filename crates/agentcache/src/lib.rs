//! # Chessmate Agent Cache
//!
//! Caches LLM re-ranking results so an identical candidate under an
//! identical plan never pays for a second model call (spec.md §4.4).
//! Two backends share one trait: an in-memory LRU for the common case,
//! and a remote KV adapter for sharing the cache across processes.

mod error;
mod key;
mod memory;
mod remote;

pub use error::{AgentCacheError, Result};
pub use key::cache_key;
pub use memory::InMemoryAgentCache;
pub use remote::RemoteAgentCache;

use async_trait::async_trait;
use chessmate_protocol::AgentEvaluation;

/// `find`/`store`/`ping` per spec.md §4.4. `find` must not block longer
/// than a small bounded timeout — the remote backend enforces this via
/// its HTTP client's request timeout; the in-memory backend is always
/// immediate.
#[async_trait]
pub trait AgentCache: Send + Sync {
    async fn find(&self, key: &str) -> Option<AgentEvaluation>;
    async fn store(&self, key: &str, entry: AgentEvaluation);
    async fn ping(&self) -> Result<()>;
}
