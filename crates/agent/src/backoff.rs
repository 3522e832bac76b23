use std::time::{Duration, SystemTime};

const INITIAL_DELAY_MS: u64 = 500;
const MAX_DELAY_MS: u64 = 8_000;

/// HTTP statuses worth a transport-level retry before the call is
/// considered failed (distinct from the circuit breaker above it, which
/// only sees the final outcome).
#[must_use]
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504 | 529)
}

/// Exponential backoff with +/-25% jitter, `attempt` 0-based.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = INITIAL_DELAY_MS.saturating_mul(1u64 << attempt.min(8));
    let capped_ms = base_ms.min(MAX_DELAY_MS);
    Duration::from_millis(apply_jitter(capped_ms))
}

fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms.max(50);
    }
    let offset = (jitter_seed() % (2 * jitter_range + 1)) - jitter_range;
    let result = base_ms as i64 + offset;
    result.max(50) as u64
}

fn jitter_seed() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as i64
}
