//! Builds every collaborator named in spec.md §9 "Polymorphism" out of
//! a [`Config`], choosing HTTP adapters when their credentials are
//! configured and falling back to deterministic in-process adapters
//! otherwise (spec.md §4.6 step 2's provider/fallback split, generalized
//! to the whole wiring step).

use crate::config::Config;
use chessmate_agent::{AgentEvaluator, HttpAgentEvaluator};
use chessmate_agentcache::{AgentCache, InMemoryAgentCache, RemoteAgentCache};
use chessmate_breaker::CircuitBreaker;
use chessmate_embedworker::{
    EmbeddingWorker, HttpVectorUpserter, PgEmbeddingJobQueue, VectorUpserter, WorkerConfig,
};
use chessmate_hybrid::{AgentStage, HybridConfig, HybridExecutor};
use chessmate_protocol::sanitize;
use chessmate_ratelimit::{RateLimiter, RateLimiterConfig};
use chessmate_server::health::{HealthCheck, HttpHealthCheck, PgHealthCheck};
use chessmate_server::{AppState, MetricsAgentCache, ServerMetrics};
use chessmate_vector::{
    EmbeddingProvider, GameRepository, HttpEmbeddingProvider, HttpVectorSearchClient, OwnedProviderOrFallback,
    PgGameRepository, PgPgnFetcher, PgnFetcher, VectorSearchClient,
};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

pub struct Wiring {
    pub state: Arc<AppState>,
    pub db_pool: sqlx::PgPool,
    pub worker: Option<Arc<EmbeddingWorker>>,
}

/// Assembles the database pool, hybrid executor (with or without the
/// agent stage), rate limiter, metrics registry, health checks, and (if
/// an embedding queue is reachable) one embedding worker — everything
/// [`crate::run`] needs before it starts serving traffic.
pub async fn build(config: &Config) -> anyhow::Result<Wiring> {
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect(&config.database_url)
        .await
        .map_err(|err| anyhow::anyhow!("connecting to postgres: {}", sanitize(&err.to_string())))?;

    let metrics = Arc::new(ServerMetrics::new());

    let games: Arc<dyn GameRepository> = Arc::new(PgGameRepository::new(db_pool.clone()));
    let vectors: Arc<dyn VectorSearchClient> =
        Arc::new(HttpVectorSearchClient::new(config.qdrant_url.clone(), config.qdrant_collection_name.clone()));

    let embedding_provider: Option<Arc<dyn EmbeddingProvider>> = config
        .openai_api_key
        .clone()
        .map(|key| -> Arc<dyn EmbeddingProvider> {
            Arc::new(HttpEmbeddingProvider::new(
                "https://api.openai.com/v1",
                key,
                "text-embedding-3-small",
                config.qdrant_vector_size,
            ))
        });
    let query_vector = match embedding_provider.clone() {
        Some(provider) => Arc::new(OwnedProviderOrFallback::new(provider)),
        None => Arc::new(OwnedProviderOrFallback::new(Arc::new(
            chessmate_vector::DeterministicFallbackProvider::new(config.qdrant_vector_size),
        ) as Arc<dyn EmbeddingProvider>)),
    };

    let mut executor = HybridExecutor::new(HybridConfig::default(), games.clone(), vectors.clone(), query_vector);

    let metrics_for_breaker = metrics.clone();
    let breaker = Arc::new(CircuitBreaker::with_metrics_hook(
        config.agent_circuit_breaker_threshold,
        config.agent_circuit_breaker_cooloff,
        Some(Box::new(move |_from, to| metrics_for_breaker.set_circuit_breaker_state(to))),
    ));

    if let Some(agent_api_key) = config.agent_api_key.clone() {
        let evaluator: Arc<dyn AgentEvaluator> = Arc::new(
            HttpAgentEvaluator::new("https://api.openai.com/v1", agent_api_key, "gpt-4o-mini").with_max_retries(2),
        );
        let cache: Option<Arc<dyn AgentCache>> = Some(build_agent_cache(config, &metrics));
        let pgns: Arc<dyn PgnFetcher> = Arc::new(PgPgnFetcher::new(db_pool.clone()));

        executor = executor.with_agent_stage(AgentStage {
            evaluator,
            cache,
            breaker: breaker.clone(),
            pgns,
        });
    }

    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        request_capacity: config.rate_limit_bucket_size,
        request_rate: config.rate_limit_requests_per_minute / 60.0,
        body_capacity: Some(config.rate_limit_body_bytes_per_minute),
        body_rate: Some(config.rate_limit_body_bytes_per_minute / 60.0),
        idle_timeout: Duration::from_secs(600),
        prune_interval: Duration::from_secs(60),
    })?);

    let health_checks = build_health_checks(config, db_pool.clone());

    let state = Arc::new(AppState::new(
        Arc::new(executor),
        limiter,
        config.max_request_body_bytes,
        metrics.clone(),
        health_checks,
    ));

    let worker = if let Some(provider) = embedding_provider {
        Some(Arc::new(build_embedding_worker(config, db_pool.clone(), provider)))
    } else {
        None
    };

    Ok(Wiring { state, db_pool, worker })
}

fn build_agent_cache(config: &Config, metrics: &Arc<ServerMetrics>) -> Arc<dyn AgentCache> {
    let inner: Arc<dyn AgentCache> = match &config.agent_cache_redis_url {
        Some(url) => Arc::new(RemoteAgentCache::with_timeout(
            url.clone(),
            Some("chessmate".to_string()),
            config.agent_cache_ttl,
            Duration::from_millis(200),
        )),
        None => {
            let capacity = NonZeroUsize::new(config.agent_cache_capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
            Arc::new(InMemoryAgentCache::new(capacity))
        }
    };
    Arc::new(MetricsAgentCache::new(inner, metrics.clone()))
}

fn build_health_checks(config: &Config, pool: sqlx::PgPool) -> Vec<Box<dyn HealthCheck>> {
    let mut checks: Vec<Box<dyn HealthCheck>> = vec![Box::new(PgHealthCheck::new(pool))];

    checks.push(Box::new(HttpHealthCheck::new(
        "qdrant",
        format!("{}/collections/{}", config.qdrant_url.trim_end_matches('/'), config.qdrant_collection_name),
        true,
    )));

    if config.openai_api_key.is_some() {
        checks.push(Box::new(HttpHealthCheck::new("openai", "https://api.openai.com/v1/models", false)));
    }
    if config.agent_cache_redis_url.is_some() {
        checks.push(Box::new(HttpHealthCheck::new(
            "agent_cache",
            config.agent_cache_redis_url.clone().unwrap_or_default(),
            false,
        )));
    }

    checks
}

fn build_embedding_worker(
    config: &Config,
    pool: sqlx::PgPool,
    provider: Arc<dyn EmbeddingProvider>,
) -> EmbeddingWorker {
    let queue = Arc::new(PgEmbeddingJobQueue::new(pool, 5));
    let upserter: Arc<dyn VectorUpserter> =
        Arc::new(HttpVectorUpserter::new(config.qdrant_url.clone(), config.qdrant_collection_name.clone()));

    let worker_config = WorkerConfig {
        worker_id: "embedworker-0".to_string(),
        batch_size: config.worker_batch_size,
        max_batch_count: config.openai_embedding_chunk_size,
        max_chars_per_request: config.openai_embedding_max_chars,
        retry_max_attempts: config.openai_retry_max_attempts,
        retry_base_delay_ms: config.openai_retry_base_delay_ms,
        max_job_attempts: 5,
        poll_sleep: Duration::from_secs(5),
    };

    EmbeddingWorker::new(worker_config, queue, provider, upserter)
}
