use crate::metrics::ServerMetrics;
use async_trait::async_trait;
use chessmate_agentcache::{AgentCache, Result as CacheResult};
use chessmate_protocol::AgentEvaluation;
use std::sync::Arc;

/// Wraps any [`AgentCache`] backend to feed the `/metrics` hit/miss
/// counters spec.md §6 requires, without the cache backends themselves
/// needing to know about Prometheus (spec.md §9 "single frozen config",
/// keeping metrics registration out of the domain crates).
pub struct MetricsAgentCache {
    inner: Arc<dyn AgentCache>,
    metrics: Arc<ServerMetrics>,
}

impl MetricsAgentCache {
    #[must_use]
    pub fn new(inner: Arc<dyn AgentCache>, metrics: Arc<ServerMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl AgentCache for MetricsAgentCache {
    async fn find(&self, key: &str) -> Option<AgentEvaluation> {
        let result = self.inner.find(key).await;
        self.metrics.record_agent_cache(result.is_some());
        result
    }

    async fn store(&self, key: &str, entry: AgentEvaluation) {
        self.inner.store(key, entry).await;
    }

    async fn ping(&self) -> CacheResult<()> {
        self.inner.ping().await
    }
}
