use crate::health::HealthCheck;
use crate::metrics::ServerMetrics;
use chessmate_hybrid::HybridExecutor;
use chessmate_ratelimit::RateLimiter;
use std::sync::Arc;

/// Everything the router's handlers close over (spec.md §9 "single
/// frozen config" passed into constructors, no ambient globals beyond
/// the process-scoped registries named there: metrics, breaker, cache).
pub struct AppState {
    pub hybrid: Arc<HybridExecutor>,
    pub limiter: Arc<RateLimiter>,
    pub max_request_body_bytes: u64,
    pub metrics: Arc<ServerMetrics>,
    pub health_checks: Vec<Box<dyn HealthCheck>>,
}

impl AppState {
    #[must_use]
    pub fn new(
        hybrid: Arc<HybridExecutor>,
        limiter: Arc<RateLimiter>,
        max_request_body_bytes: u64,
        metrics: Arc<ServerMetrics>,
        health_checks: Vec<Box<dyn HealthCheck>>,
    ) -> Self {
        Self {
            hybrid,
            limiter,
            max_request_body_bytes,
            metrics,
            health_checks,
        }
    }
}
