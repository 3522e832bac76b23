use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Process-wide Prometheus registry plus the series named in spec.md §6
/// "Metrics endpoint". Assembled once at startup (spec.md §9
/// "Configuration") and shared by reference from [`crate::AppState`].
pub struct ServerMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_latency: HistogramVec,
    rate_limit_total: IntCounterVec,
    rate_limit_per_client: IntCounterVec,
    agent_cache_hits: IntCounter,
    agent_cache_misses: IntCounter,
    agent_eval_total: IntCounter,
    agent_eval_errors: IntCounter,
    agent_eval_latency: Histogram,
    circuit_breaker_state: IntGauge,
    db_pool_capacity: IntGauge,
    db_pool_in_use: IntGauge,
    db_pool_available: IntGauge,
    db_pool_waiting: IntGauge,
    db_pool_wait_ratio: Gauge,
    embed_worker_processed: IntCounter,
    embed_worker_failed: IntCounter,
    embed_queue_depth: IntGauge,
}

impl ServerMetrics {
    #[must_use]
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("chessmate_requests_total", "Total HTTP requests by route and status"),
            &["route", "status"],
        )
        .expect("valid metric");
        let request_latency = HistogramVec::new(
            HistogramOpts::new("chessmate_request_latency_seconds", "Request latency by route"),
            &["route"],
        )
        .expect("valid metric");
        let rate_limit_total = IntCounterVec::new(
            Opts::new("chessmate_rate_limit_total", "Rate limiter decisions by outcome"),
            &["outcome"],
        )
        .expect("valid metric");
        let rate_limit_per_client = IntCounterVec::new(
            Opts::new("chessmate_rate_limit_limited_total", "Rate-limited requests by client"),
            &["client"],
        )
        .expect("valid metric");
        let agent_cache_hits = IntCounter::new("chessmate_agent_cache_hits_total", "Agent cache hits").expect("valid metric");
        let agent_cache_misses =
            IntCounter::new("chessmate_agent_cache_misses_total", "Agent cache misses").expect("valid metric");
        let agent_eval_total =
            IntCounter::new("chessmate_agent_evaluations_total", "Agent evaluator calls").expect("valid metric");
        let agent_eval_errors =
            IntCounter::new("chessmate_agent_evaluation_errors_total", "Agent evaluator failures").expect("valid metric");
        let agent_eval_latency = Histogram::with_opts(HistogramOpts::new(
            "chessmate_agent_evaluation_latency_seconds",
            "Agent evaluator call latency",
        ))
        .expect("valid metric");
        let circuit_breaker_state = IntGauge::new(
            "chessmate_circuit_breaker_state",
            "Circuit breaker state: 0=disabled 1=closed 2=half_open 3=open",
        )
        .expect("valid metric");
        let db_pool_capacity = IntGauge::new("chessmate_db_pool_capacity", "Configured pool size").expect("valid metric");
        let db_pool_in_use = IntGauge::new("chessmate_db_pool_in_use", "Connections currently checked out").expect("valid metric");
        let db_pool_available = IntGauge::new("chessmate_db_pool_available", "Idle connections available").expect("valid metric");
        let db_pool_waiting = IntGauge::new("chessmate_db_pool_waiting", "Callers waiting for a connection").expect("valid metric");
        let db_pool_wait_ratio = Gauge::new("chessmate_db_pool_wait_ratio", "in_use / capacity").expect("valid metric");
        let embed_worker_processed =
            IntCounter::new("chessmate_embed_worker_processed_total", "Embedding jobs processed").expect("valid metric");
        let embed_worker_failed =
            IntCounter::new("chessmate_embed_worker_failed_total", "Embedding jobs failed").expect("valid metric");
        let embed_queue_depth = IntGauge::new("chessmate_embed_queue_depth", "Pending embedding jobs").expect("valid metric");

        for collector in [
            Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(request_latency.clone()),
            Box::new(rate_limit_total.clone()),
            Box::new(rate_limit_per_client.clone()),
            Box::new(agent_cache_hits.clone()),
            Box::new(agent_cache_misses.clone()),
            Box::new(agent_eval_total.clone()),
            Box::new(agent_eval_errors.clone()),
            Box::new(agent_eval_latency.clone()),
            Box::new(circuit_breaker_state.clone()),
            Box::new(db_pool_capacity.clone()),
            Box::new(db_pool_in_use.clone()),
            Box::new(db_pool_available.clone()),
            Box::new(db_pool_waiting.clone()),
            Box::new(db_pool_wait_ratio.clone()),
            Box::new(embed_worker_processed.clone()),
            Box::new(embed_worker_failed.clone()),
            Box::new(embed_queue_depth.clone()),
        ] {
            registry.register(collector).expect("unique metric name");
        }

        Self {
            registry,
            requests_total,
            request_latency,
            rate_limit_total,
            rate_limit_per_client,
            agent_cache_hits,
            agent_cache_misses,
            agent_eval_total,
            agent_eval_errors,
            agent_eval_latency,
            circuit_breaker_state,
            db_pool_capacity,
            db_pool_in_use,
            db_pool_available,
            db_pool_waiting,
            db_pool_wait_ratio,
            embed_worker_processed,
            embed_worker_failed,
            embed_queue_depth,
        }
    }

    pub fn record_request(&self, route: &str, status: u16, latency_secs: f64) {
        self.requests_total.with_label_values(&[route, &status.to_string()]).inc();
        self.request_latency.with_label_values(&[route]).observe(latency_secs);
    }

    pub fn record_rate_limit(&self, allowed: bool, client: &str) {
        let outcome = if allowed { "allowed" } else { "limited" };
        self.rate_limit_total.with_label_values(&[outcome]).inc();
        if !allowed {
            self.rate_limit_per_client.with_label_values(&[client]).inc();
        }
    }

    pub fn record_agent_cache(&self, hit: bool) {
        if hit {
            self.agent_cache_hits.inc();
        } else {
            self.agent_cache_misses.inc();
        }
    }

    pub fn record_agent_evaluation(&self, latency_secs: f64, errored: bool) {
        self.agent_eval_total.inc();
        self.agent_eval_latency.observe(latency_secs);
        if errored {
            self.agent_eval_errors.inc();
        }
    }

    /// Mapping for the breaker's `on_transition` hook (spec.md §4.3
    /// "metrics hook"): `0=disabled 1=closed 2=half_open 3=open`.
    pub fn set_circuit_breaker_state(&self, state: chessmate_breaker::BreakerState) {
        let value = match state {
            chessmate_breaker::BreakerState::Disabled => 0,
            chessmate_breaker::BreakerState::Closed => 1,
            chessmate_breaker::BreakerState::HalfOpen => 2,
            chessmate_breaker::BreakerState::Open => 3,
        };
        self.circuit_breaker_state.set(value);
    }

    pub fn observe_db_pool(&self, capacity: u32, in_use: u32, waiting: u32) {
        let capacity = capacity as i64;
        let in_use = in_use as i64;
        self.db_pool_capacity.set(capacity);
        self.db_pool_in_use.set(in_use);
        self.db_pool_available.set((capacity - in_use).max(0));
        self.db_pool_waiting.set(waiting as i64);
        if capacity > 0 {
            self.db_pool_wait_ratio.set(in_use as f64 / capacity as f64);
        }
    }

    pub fn observe_embed_worker(&self, snapshot: &chessmate_embedworker::WorkerHealthSnapshot, queue_depth: usize) {
        let processed_delta = snapshot.processed_total.saturating_sub(self.embed_worker_processed.get());
        let failed_delta = snapshot.failed_total.saturating_sub(self.embed_worker_failed.get());
        self.embed_worker_processed.inc_by(processed_delta);
        self.embed_worker_failed.inc_by(failed_delta);
        self.embed_queue_depth.set(queue_depth as i64);
    }

    #[must_use]
    pub fn encode(&self) -> String {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).expect("valid encoding");
        String::from_utf8(buffer).expect("prometheus text is valid utf8")
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
