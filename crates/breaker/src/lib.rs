//! # Chessmate Circuit Breaker
//!
//! Explicit four-state breaker (spec.md §4.3) guarding a downstream
//! collaborator that can fail slowly (the LLM agent evaluator). Unlike a
//! pair of booleans, `disabled`/`closed`/`half_open`/`open` is a single
//! tagged state so an invalid combination (e.g. "open and disabled") is
//! unrepresentable. All mutation happens under one `parking_lot::Mutex`,
//! the discipline `examples/elisplash-paw`'s `CircuitBreaker` uses for
//! the same kind of shared, frequently-polled state.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Externally observable state, independent of the internal bookkeeping
/// (failure counters, `open_until` deadlines). Reported on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Disabled,
    Closed,
    HalfOpen,
    Open,
}

enum Inner {
    Disabled,
    Closed { failures: u32 },
    Open { open_until: Instant },
    HalfOpen { probe_issued: bool },
}

impl Inner {
    fn kind(&self) -> BreakerState {
        match self {
            Inner::Disabled => BreakerState::Disabled,
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }
}

/// Invoked whenever the breaker transitions between observable states,
/// e.g. to increment a Prometheus counter (spec.md §4.3 "metrics hook").
pub type MetricsHook = Box<dyn Fn(BreakerState, BreakerState) + Send + Sync>;

pub struct CircuitBreaker {
    threshold: u32,
    cooloff: Duration,
    inner: Mutex<Inner>,
    on_transition: Option<MetricsHook>,
}

impl CircuitBreaker {
    /// `threshold <= 0` permanently disables the breaker (`should_allow`
    /// always returns true, failures/successes are no-ops).
    #[must_use]
    pub fn new(threshold: u32, cooloff: Duration) -> Self {
        Self::with_metrics_hook(threshold, cooloff, None)
    }

    #[must_use]
    pub fn with_metrics_hook(threshold: u32, cooloff: Duration, hook: Option<MetricsHook>) -> Self {
        let initial = if threshold == 0 {
            Inner::Disabled
        } else {
            Inner::Closed { failures: 0 }
        };
        Self {
            threshold,
            cooloff,
            inner: Mutex::new(initial),
            on_transition: hook,
        }
    }

    /// Sole admission gate (spec.md §4.3 "Observable contract"). Returns
    /// true exactly once per cool-off window while half-open.
    #[must_use]
    pub fn should_allow(&self) -> bool {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let before = guard.kind();

        match &*guard {
            Inner::Disabled | Inner::Closed { .. } => true,
            Inner::Open { open_until } => {
                if now < *open_until {
                    false
                } else {
                    *guard = Inner::HalfOpen { probe_issued: true };
                    self.notify(before, guard.kind());
                    true
                }
            }
            Inner::HalfOpen { probe_issued } => !probe_issued,
        }
    }

    /// `closed`: clears the failure counter. `half_open`: closes the
    /// breaker. No-op when `disabled` or already `open`.
    pub fn record_success(&self) {
        let mut guard = self.inner.lock();
        let before = guard.kind();
        match &*guard {
            Inner::Closed { .. } => *guard = Inner::Closed { failures: 0 },
            Inner::HalfOpen { .. } => *guard = Inner::Closed { failures: 0 },
            Inner::Disabled | Inner::Open { .. } => {}
        }
        self.notify(before, guard.kind());
    }

    /// `closed`: increments the failure counter, tripping to `open` at
    /// `threshold`. `half_open`: reopens immediately. No-op when
    /// `disabled` or already `open`.
    pub fn record_failure(&self) {
        let mut guard = self.inner.lock();
        let before = guard.kind();
        match &*guard {
            Inner::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.threshold {
                    log::warn!(
                        "circuit breaker tripped after {failures} consecutive failures, cooling off for {:?}",
                        self.cooloff
                    );
                    *guard = Inner::Open {
                        open_until: Instant::now() + self.cooloff,
                    };
                } else {
                    *guard = Inner::Closed { failures };
                }
            }
            Inner::HalfOpen { .. } => {
                *guard = Inner::Open {
                    open_until: Instant::now() + self.cooloff,
                };
            }
            Inner::Disabled | Inner::Open { .. } => {}
        }
        self.notify(before, guard.kind());
    }

    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().kind()
    }

    fn notify(&self, before: BreakerState, after: BreakerState) {
        if before != after {
            if let Some(hook) = &self.on_transition {
                hook(before, after);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn disabled_breaker_always_allows() {
        let breaker = CircuitBreaker::new(0, Duration::from_secs(30));
        assert_eq!(breaker.state(), BreakerState::Disabled);
        for _ in 0..10 {
            breaker.record_failure();
            assert!(breaker.should_allow());
        }
    }

    #[test]
    fn trips_open_at_threshold_and_rejects() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.should_allow());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn half_open_permits_exactly_one_probe() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn half_open_success_closes_the_breaker() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.should_allow());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.should_allow());
    }

    #[test]
    fn half_open_failure_reopens_with_fresh_cooloff() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(5));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(10));
        assert!(breaker.should_allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn success_while_closed_clears_failure_counter() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn metrics_hook_fires_on_state_transitions() {
        let transitions = Arc::new(AtomicUsize::new(0));
        let counter = transitions.clone();
        let breaker = CircuitBreaker::with_metrics_hook(
            1,
            Duration::from_secs(60),
            Some(Box::new(move |_before, _after| {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
        );
        breaker.record_failure();
        assert_eq!(transitions.load(Ordering::Relaxed), 1);
        breaker.record_failure();
        assert_eq!(transitions.load(Ordering::Relaxed), 1);
    }
}
