use std::time::Duration;

/// A single token reservoir: capacity, refill rate per second, and the
/// current token count. Refilling and deduction never exceed capacity
/// (spec.md §4.2 invariant).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reservoir {
    capacity: f64,
    rate: f64,
    tokens: f64,
}

impl Reservoir {
    pub(crate) fn new(capacity: f64, rate: f64) -> Self {
        Self {
            capacity,
            rate,
            tokens: capacity,
        }
    }

    pub(crate) fn refill(&mut self, elapsed_secs: f64) {
        self.tokens = (self.tokens + elapsed_secs * self.rate).min(self.capacity);
    }

    pub(crate) fn has(&self, cost: f64) -> bool {
        self.tokens >= cost
    }

    pub(crate) fn take(&mut self, cost: f64) {
        self.tokens = (self.tokens - cost).max(0.0);
    }

    pub(crate) fn remaining(&self) -> f64 {
        self.tokens
    }

    /// Seconds until `cost` tokens are available, `None` if the
    /// reservoir can never refill (rate is zero).
    pub(crate) fn retry_delay(&self, cost: f64) -> Option<Duration> {
        if self.tokens >= cost {
            return Some(Duration::ZERO);
        }
        if self.rate <= 0.0 {
            return None;
        }
        let deficit = cost - self.tokens;
        Some(Duration::from_secs_f64(deficit / self.rate))
    }
}

/// Per-client bucket: a required request-count reservoir and an optional
/// body-byte reservoir, plus the idle-eviction timestamp.
pub(crate) struct Bucket {
    pub(crate) request: Reservoir,
    pub(crate) body: Option<Reservoir>,
    pub(crate) last_seen: std::time::Instant,
}

impl Bucket {
    pub(crate) fn new(request: Reservoir, body: Option<Reservoir>, now: std::time::Instant) -> Self {
        Self {
            request,
            body,
            last_seen: now,
        }
    }

    pub(crate) fn refill(&mut self, elapsed_secs: f64) {
        self.request.refill(elapsed_secs);
        if let Some(body) = &mut self.body {
            body.refill(elapsed_secs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refill_caps_at_capacity() {
        let mut r = Reservoir::new(10.0, 5.0);
        r.take(8.0);
        r.refill(10.0);
        assert_eq!(r.remaining(), 10.0);
    }

    #[test]
    fn retry_delay_is_zero_when_tokens_available() {
        let r = Reservoir::new(10.0, 1.0);
        assert_eq!(r.retry_delay(1.0), Some(Duration::ZERO));
    }

    #[test]
    fn retry_delay_scales_with_deficit_over_rate() {
        let mut r = Reservoir::new(10.0, 2.0);
        r.take(10.0);
        assert_eq!(r.retry_delay(4.0), Some(Duration::from_secs(2)));
    }

    #[test]
    fn retry_delay_is_none_when_rate_is_zero() {
        let mut r = Reservoir::new(10.0, 0.0);
        r.take(10.0);
        assert_eq!(r.retry_delay(1.0), None);
    }
}
