//! Frozen process configuration, assembled once from environment
//! variables (spec.md §6 "Environment configuration") and validated
//! eagerly with remediation hints (spec.md §9 "Configuration"), the way
//! the teacher's `context-finder` binary validates model/cache flags
//! before entering its command dispatch.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {name} ({hint})")]
    Missing { name: &'static str, hint: &'static str },
    #[error("environment variable {name} has an invalid value {value:?}: {hint}")]
    Invalid {
        name: &'static str,
        value: String,
        hint: &'static str,
    },
}

/// Everything the binary needs to wire up the server and embedding
/// workers. Built once in [`Config::from_env`] and never mutated; every
/// constructor downstream takes fields by value or reference (spec.md §9
/// "single frozen config value").
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub worker_count: usize,

    pub database_url: String,
    pub db_pool_size: u32,

    pub qdrant_url: String,
    pub qdrant_collection_name: String,
    pub qdrant_vector_size: usize,
    pub qdrant_distance: String,

    pub openai_api_key: Option<String>,
    pub openai_embedding_chunk_size: usize,
    pub openai_embedding_max_chars: usize,
    pub openai_retry_max_attempts: u32,
    pub openai_retry_base_delay_ms: u64,

    pub agent_api_key: Option<String>,
    pub agent_reasoning_effort: String,
    pub agent_verbosity: String,
    pub agent_request_timeout: Duration,
    pub agent_circuit_breaker_threshold: u32,
    pub agent_circuit_breaker_cooloff: Duration,

    pub agent_cache_redis_url: Option<String>,
    pub agent_cache_ttl: Option<Duration>,
    pub agent_cache_capacity: usize,

    pub rate_limit_requests_per_minute: f64,
    pub rate_limit_bucket_size: f64,
    pub rate_limit_body_bytes_per_minute: f64,
    pub max_request_body_bytes: u64,

    pub max_pending_embeddings: usize,
    pub worker_batch_size: usize,
}

impl Config {
    /// Loads and validates every knob named in spec.md §6. Fails fast on
    /// the first problem rather than collecting all of them, matching the
    /// teacher binary's "exit non-zero with a remediation hint" posture.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_opt_env("CHESSMATE_BIND_ADDR", "host:port, e.g. 0.0.0.0:8080")?
            .unwrap_or_else(|| "0.0.0.0:8080".parse().expect("valid default bind address"));
        let worker_count = parse_env_or("CHESSMATE_WORKER_COUNT", 1usize, "a positive integer")?;

        let database_url = require_env("DATABASE_URL", "set it to a postgres:// connection string")?;
        let db_pool_size = parse_env_or("CHESSMATE_DB_POOL_SIZE", 10u32, "a positive integer")?;

        let qdrant_url = require_env("QDRANT_URL", "set it to the Qdrant HTTP base URL, e.g. http://localhost:6333")?;
        let qdrant_collection_name = require_env("QDRANT_COLLECTION_NAME", "set it to the target collection name")?;
        let qdrant_vector_size = parse_env("QDRANT_VECTOR_SIZE", "a positive integer matching the embedding model's output dimension")?;
        let qdrant_distance = env::var("QDRANT_DISTANCE").unwrap_or_else(|_| "Cosine".to_string());

        let openai_api_key = non_empty_opt_env("OPENAI_API_KEY");
        let openai_embedding_chunk_size = parse_env_or("OPENAI_EMBEDDING_CHUNK_SIZE", 16usize, "a positive integer")?;
        let openai_embedding_max_chars = parse_env_or("OPENAI_EMBEDDING_MAX_CHARS", 8_000usize, "a positive integer")?;
        let openai_retry_max_attempts = parse_env_or("OPENAI_RETRY_MAX_ATTEMPTS", 3u32, "a non-negative integer")?;
        let openai_retry_base_delay_ms = parse_env_or("OPENAI_RETRY_BASE_DELAY_MS", 500u64, "a positive integer")?;

        let agent_api_key = non_empty_opt_env("AGENT_API_KEY");
        let agent_reasoning_effort = env::var("AGENT_REASONING_EFFORT").unwrap_or_else(|_| "low".to_string());
        let agent_verbosity = env::var("AGENT_VERBOSITY").unwrap_or_else(|_| "low".to_string());
        let agent_request_timeout = Duration::from_secs(parse_env_or(
            "AGENT_REQUEST_TIMEOUT_SECONDS",
            15u64,
            "a positive integer",
        )?);
        let agent_circuit_breaker_threshold =
            parse_env_or("AGENT_CIRCUIT_BREAKER_THRESHOLD", 5u32, "a non-negative integer (0 disables the breaker)")?;
        let agent_circuit_breaker_cooloff = Duration::from_secs(parse_env_or(
            "AGENT_CIRCUIT_BREAKER_COOLOFF_SECONDS",
            30u64,
            "a positive integer",
        )?);

        let agent_cache_redis_url = non_empty_opt_env("AGENT_CACHE_REDIS_URL");
        let agent_cache_ttl = parse_opt_env::<u64>("AGENT_CACHE_TTL_SECONDS", "a positive integer")?.map(Duration::from_secs);
        let agent_cache_capacity = parse_env_or("AGENT_CACHE_CAPACITY", 10_000usize, "a positive integer")?;

        let rate_limit_requests_per_minute =
            parse_env_or("CHESSMATE_RATE_LIMIT_REQUESTS_PER_MINUTE", 300.0, "a positive number")?;
        let rate_limit_bucket_size = parse_env_or("CHESSMATE_RATE_LIMIT_BUCKET_SIZE", 60.0, "a positive number")?;
        let rate_limit_body_bytes_per_minute = parse_env_or(
            "CHESSMATE_RATE_LIMIT_BODY_BYTES_PER_MINUTE",
            50_000_000.0,
            "a positive number",
        )?;
        let max_request_body_bytes = parse_env_or("CHESSMATE_MAX_REQUEST_BODY_BYTES", 1_048_576u64, "a positive integer")?;

        let max_pending_embeddings = parse_env_or("CHESSMATE_MAX_PENDING_EMBEDDINGS", 10_000usize, "a positive integer")?;
        let worker_batch_size = parse_env_or("CHESSMATE_WORKER_BATCH_SIZE", 50usize, "a positive integer")?;

        if qdrant_vector_size == 0 {
            return Err(ConfigError::Invalid {
                name: "QDRANT_VECTOR_SIZE",
                value: qdrant_vector_size.to_string(),
                hint: "must be a positive integer matching the embedding model's output dimension",
            });
        }
        if rate_limit_requests_per_minute <= 0.0 || rate_limit_bucket_size <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "CHESSMATE_RATE_LIMIT_REQUESTS_PER_MINUTE",
                value: rate_limit_requests_per_minute.to_string(),
                hint: "rate and bucket size must both be positive",
            });
        }

        Ok(Self {
            bind_addr,
            worker_count,
            database_url,
            db_pool_size,
            qdrant_url,
            qdrant_collection_name,
            qdrant_vector_size,
            qdrant_distance,
            openai_api_key,
            openai_embedding_chunk_size,
            openai_embedding_max_chars,
            openai_retry_max_attempts,
            openai_retry_base_delay_ms,
            agent_api_key,
            agent_reasoning_effort,
            agent_verbosity,
            agent_request_timeout,
            agent_circuit_breaker_threshold,
            agent_circuit_breaker_cooloff,
            agent_cache_redis_url,
            agent_cache_ttl,
            agent_cache_capacity,
            rate_limit_requests_per_minute,
            rate_limit_bucket_size,
            rate_limit_body_bytes_per_minute,
            max_request_body_bytes,
            max_pending_embeddings,
            worker_batch_size,
        })
    }
}

fn require_env(name: &'static str, hint: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { name, hint }),
    }
}

fn non_empty_opt_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(name: &'static str, hint: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = require_env(name, hint)?;
    raw.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: raw,
        hint,
    })
}

fn parse_env_or<T>(name: &'static str, default: T, hint: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            hint,
        }),
        _ => Ok(default),
    }
}

fn parse_opt_env<T>(name: &'static str, hint: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw, hint }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_chessmate_env() {
        for (key, _) in env::vars() {
            if key.starts_with("CHESSMATE_")
                || key.starts_with("AGENT_")
                || key.starts_with("OPENAI_")
                || key.starts_with("QDRANT_")
                || key == "DATABASE_URL"
            {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn missing_database_url_reports_remediation_hint() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_chessmate_env();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { name: "DATABASE_URL", .. }));
    }

    #[test]
    fn minimal_required_vars_produce_sane_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_chessmate_env();
        env::set_var("DATABASE_URL", "postgres://localhost/chessmate");
        env::set_var("QDRANT_URL", "http://localhost:6333");
        env::set_var("QDRANT_COLLECTION_NAME", "positions");
        env::set_var("QDRANT_VECTOR_SIZE", "768");

        let config = Config::from_env().unwrap();
        assert_eq!(config.qdrant_vector_size, 768);
        assert_eq!(config.worker_count, 1);
        assert!(config.agent_api_key.is_none());
        clear_chessmate_env();
    }

    #[test]
    fn zero_vector_size_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_chessmate_env();
        env::set_var("DATABASE_URL", "postgres://localhost/chessmate");
        env::set_var("QDRANT_URL", "http://localhost:6333");
        env::set_var("QDRANT_COLLECTION_NAME", "positions");
        env::set_var("QDRANT_VECTOR_SIZE", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "QDRANT_VECTOR_SIZE", .. }));
        clear_chessmate_env();
    }
}
