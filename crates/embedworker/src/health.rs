use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Throughput/queue-depth counters the worker exposes to `/metrics` and
/// `/health` (spec.md §4.7 step 7, §6 "Required series"), in the style
/// of `crates/indexer/src/health.rs`'s `HealthSnapshot`.
#[derive(Default)]
pub struct WorkerHealth {
    processed_total: AtomicU64,
    failed_total: AtomicU64,
    last_poll_unix_ms: AtomicU64,
}

impl WorkerHealth {
    pub fn record_processed(&self, count: u64) {
        self.processed_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed(&self, count: u64) {
        self.failed_total.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_poll(&self) {
        self.last_poll_unix_ms.store(current_unix_ms(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> WorkerHealthSnapshot {
        WorkerHealthSnapshot {
            processed_total: self.processed_total.load(Ordering::Relaxed),
            failed_total: self.failed_total.load(Ordering::Relaxed),
            last_poll_unix_ms: self.last_poll_unix_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerHealthSnapshot {
    pub processed_total: u64,
    pub failed_total: u64,
    pub last_poll_unix_ms: u64,
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let health = WorkerHealth::default();
        health.record_processed(3);
        health.record_processed(2);
        health.record_failed(1);
        let snapshot = health.snapshot();
        assert_eq!(snapshot.processed_total, 5);
        assert_eq!(snapshot.failed_total, 1);
    }

    #[test]
    fn poll_timestamp_updates() {
        let health = WorkerHealth::default();
        assert_eq!(health.snapshot().last_poll_unix_ms, 0);
        health.record_poll();
        assert!(health.snapshot().last_poll_unix_ms > 0);
    }
}
