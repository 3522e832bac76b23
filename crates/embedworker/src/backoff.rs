use std::time::{Duration, SystemTime};

/// Exponential backoff with jitter, parameterized by the worker's
/// configured base delay (spec.md §4.7 "retry_base_delay_ms"), in the
/// same style as `chessmate_agent`'s retry helper, itself modeled on
/// `examples/elisplash-paw/src-tauri/src/engine/http.rs`.
#[must_use]
pub fn backoff_delay(attempt: u32, base_delay_ms: u64) -> Duration {
    let base = base_delay_ms.saturating_mul(1u64 << attempt.min(8));
    let capped = base.min(base_delay_ms.saturating_mul(32).max(base_delay_ms));
    Duration::from_millis(apply_jitter(capped))
}

fn apply_jitter(base_ms: u64) -> u64 {
    let jitter_range = (base_ms / 4) as i64;
    if jitter_range == 0 {
        return base_ms.max(50);
    }
    let offset = (jitter_seed() % (2 * jitter_range + 1)) - jitter_range;
    (base_ms as i64 + offset).max(50) as u64
}

fn jitter_seed() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt() {
        let first = backoff_delay(0, 200);
        let later = backoff_delay(4, 200);
        assert!(later >= first);
    }

    #[test]
    fn delay_is_never_below_the_jitter_floor() {
        assert!(backoff_delay(0, 0).as_millis() >= 50);
    }
}
