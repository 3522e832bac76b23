//! # Chessmate Rate Limiter
//!
//! A per-client dual token-bucket limiter (spec.md §4.2): one reservoir
//! for request counts, an optional second reservoir for request-body
//! bytes. State lives behind a single [`parking_lot::Mutex`]-guarded
//! map, following the single-owner-handle discipline the rest of the
//! workspace uses for shared mutable state.

mod bucket;
mod error;
mod key;

pub use error::{RateLimiterError, Result};

use bucket::{Bucket, Reservoir};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Construction parameters. Rates are "tokens per second"; capacities
/// are the reservoir ceilings (spec.md §4.2 "State").
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub request_capacity: f64,
    pub request_rate: f64,
    pub body_capacity: Option<f64>,
    pub body_rate: Option<f64>,
    pub idle_timeout: Duration,
    pub prune_interval: Duration,
}

/// Outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Allowed {
        remaining_request_tokens: f64,
        remaining_body_tokens: Option<f64>,
    },
    Limited {
        retry_after: Duration,
        remaining_request_tokens: f64,
        remaining_body_tokens: Option<f64>,
    },
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    buckets: Mutex<HashMap<String, Bucket>>,
    last_prune: Mutex<Instant>,
    limited_request_count: AtomicU64,
    limited_body_count: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Result<Self> {
        if config.request_capacity <= 0.0 || config.request_rate <= 0.0 {
            return Err(RateLimiterError::InvalidRequestReservoir {
                capacity: config.request_capacity,
                rate: config.request_rate,
            });
        }
        match (config.body_capacity, config.body_rate) {
            (Some(cap), Some(rate)) if cap <= 0.0 || rate <= 0.0 => {
                return Err(RateLimiterError::InvalidBodyReservoir { capacity: cap, rate })
            }
            _ => {}
        }

        Ok(Self {
            config,
            buckets: Mutex::new(HashMap::new()),
            last_prune: Mutex::new(Instant::now()),
            limited_request_count: AtomicU64::new(0),
            limited_body_count: AtomicU64::new(0),
        })
    }

    /// spec.md §4.2 `check` operation, steps 1-7.
    #[must_use]
    pub fn check(&self, key: &str, body_bytes: Option<u64>) -> Decision {
        let key = key::normalize_key(key);
        let now = Instant::now();

        self.maybe_prune(now);

        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(key).or_insert_with(|| {
            Bucket::new(
                Reservoir::new(self.config.request_capacity, self.config.request_rate),
                self.config
                    .body_capacity
                    .zip(self.config.body_rate)
                    .map(|(cap, rate)| Reservoir::new(cap, rate)),
                now,
            )
        });

        let elapsed = now.duration_since(bucket.last_seen).as_secs_f64();
        bucket.refill(elapsed);
        bucket.last_seen = now;

        let body_cost = if bucket.body.is_some() { body_bytes.unwrap_or(0) as f64 } else { 0.0 };
        let request_ok = bucket.request.has(1.0);
        let body_ok = bucket.body.as_ref().map_or(true, |b| b.has(body_cost));

        if request_ok && body_ok {
            bucket.request.take(1.0);
            if let Some(body) = &mut bucket.body {
                body.take(body_cost);
            }
            return Decision::Allowed {
                remaining_request_tokens: bucket.request.remaining(),
                remaining_body_tokens: bucket.body.as_ref().map(Reservoir::remaining),
            };
        }

        let mut retry_after = Duration::ZERO;
        if !request_ok {
            self.limited_request_count.fetch_add(1, Ordering::Relaxed);
            if let Some(delay) = bucket.request.retry_delay(1.0) {
                retry_after = retry_after.max(delay);
            } else {
                retry_after = Duration::MAX;
            }
        }
        if !body_ok {
            self.limited_body_count.fetch_add(1, Ordering::Relaxed);
            if let Some(body) = &bucket.body {
                if let Some(delay) = body.retry_delay(body_cost) {
                    retry_after = retry_after.max(delay);
                } else {
                    retry_after = Duration::MAX;
                }
            }
        }

        Decision::Limited {
            retry_after,
            remaining_request_tokens: bucket.request.remaining(),
            remaining_body_tokens: bucket.body.as_ref().map(Reservoir::remaining),
        }
    }

    #[must_use]
    pub fn limited_request_count(&self) -> u64 {
        self.limited_request_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn limited_body_count(&self) -> u64 {
        self.limited_body_count.load(Ordering::Relaxed)
    }

    fn maybe_prune(&self, now: Instant) {
        let mut last_prune = self.last_prune.lock();
        if now.duration_since(*last_prune) < self.config.prune_interval {
            return;
        }
        *last_prune = now;
        drop(last_prune);

        let idle_timeout = self.config.idle_timeout;
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < idle_timeout);
        let evicted = before - buckets.len();
        if evicted > 0 {
            log::debug!("rate limiter pruned {evicted} idle bucket(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RateLimiterConfig {
        RateLimiterConfig {
            request_capacity: 2.0,
            request_rate: 1.0,
            body_capacity: Some(100.0),
            body_rate: Some(50.0),
            idle_timeout: Duration::from_secs(60),
            prune_interval: Duration::from_secs(30),
        }
    }

    #[test]
    fn rejects_non_positive_construction_parameters() {
        let mut bad = config();
        bad.request_rate = 0.0;
        assert!(RateLimiter::new(bad).is_err());
    }

    #[test]
    fn allows_until_capacity_then_limits() {
        let limiter = RateLimiter::new(config()).unwrap();
        assert!(limiter.check("client-a", Some(10)).is_allowed());
        assert!(limiter.check("client-a", Some(10)).is_allowed());
        let third = limiter.check("client-a", Some(10));
        assert!(!third.is_allowed());
    }

    #[test]
    fn body_token_exhaustion_limits_independently_of_request_tokens() {
        let limiter = RateLimiter::new(config()).unwrap();
        let decision = limiter.check("client-b", Some(1000));
        assert!(!decision.is_allowed());
        assert_eq!(limiter.limited_body_count(), 1);
    }

    #[test]
    fn different_clients_get_independent_buckets() {
        let limiter = RateLimiter::new(config()).unwrap();
        assert!(limiter.check("client-c", None).is_allowed());
        assert!(limiter.check("client-c", None).is_allowed());
        assert!(limiter.check("client-d", None).is_allowed());
    }

    #[test]
    fn key_normalization_merges_equivalent_client_keys() {
        let limiter = RateLimiter::new(config()).unwrap();
        assert!(limiter.check("  Client-E  ", None).is_allowed());
        assert!(limiter.check("client-e", None).is_allowed());
        assert!(!limiter.check("CLIENT-E", None).is_allowed());
    }
}
