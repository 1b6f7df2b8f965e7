//! Per-key token-bucket rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// A token was available and has been deducted.
    Allowed,
    /// No token available.
    Denied {
        /// Whole seconds until a token will be available. Computed as
        /// `ceil((1 − tokens) / refill_rate)`. With sub-second refill
        /// rates the whole-second granularity can misstate the true
        /// wait; callers should treat this as advisory.
        retry_after_secs: u64,
    },
}

/// Point-in-time view of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateStatus {
    /// Tokens currently available.
    pub available: f64,
    /// Bucket capacity.
    pub capacity: f64,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, capacity: f64, rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// A token bucket per key. Keys are independent; each bucket's
/// refill-and-deduct is atomic with respect to other calls on the same
/// key (per-bucket locking, no lock held across awaits — the limiter
/// is fully synchronous).
///
/// Buckets are created lazily, full, on first check. Uses
/// `tokio::time::Instant` so tests can drive the clock with
/// `tokio::time::advance` under a paused runtime.
pub struct RateLimiter {
    capacity: f64,
    refill_per_second: f64,
    buckets: Mutex<HashMap<String, Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    /// Create a limiter with the given burst capacity and refill rate.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `refill_per_second` is not
    /// positive.
    pub fn new(capacity: u32, refill_per_second: f64) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");
        assert!(
            refill_per_second > 0.0,
            "refill rate must be positive"
        );
        Self {
            capacity: f64::from(capacity),
            refill_per_second,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn bucket(&self, key: &str) -> Arc<Mutex<Bucket>> {
        let mut buckets = self.buckets.lock().expect("bucket map poisoned");
        buckets
            .entry(key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(Bucket::full(self.capacity))))
            .clone()
    }

    /// Check (and consume) one token for the key.
    pub fn check(&self, key: &str) -> RateDecision {
        let bucket = self.bucket(key);
        let mut bucket = bucket.lock().expect("bucket poisoned");
        bucket.refill(self.capacity, self.refill_per_second);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            RateDecision::Allowed
        } else {
            let deficit = 1.0 - bucket.tokens;
            RateDecision::Denied {
                retry_after_secs: (deficit / self.refill_per_second).ceil() as u64,
            }
        }
    }

    /// Restore one key's bucket to full capacity.
    pub fn reset(&self, key: &str) {
        let mut buckets = self.buckets.lock().expect("bucket map poisoned");
        if let Some(bucket) = buckets.get_mut(key) {
            *bucket.lock().expect("bucket poisoned") = Bucket::full(self.capacity);
        }
    }

    /// Drop all buckets. The next check on any key starts full.
    pub fn reset_all(&self) {
        self.buckets.lock().expect("bucket map poisoned").clear();
    }

    /// Current `{available, capacity}` per key, with refill applied.
    pub fn status(&self) -> HashMap<String, RateStatus> {
        let buckets = self.buckets.lock().expect("bucket map poisoned");
        buckets
            .iter()
            .map(|(key, bucket)| {
                let mut bucket = bucket.lock().expect("bucket poisoned");
                bucket.refill(self.capacity, self.refill_per_second);
                (
                    key.clone(),
                    RateStatus {
                        available: bucket.tokens,
                        capacity: self.capacity,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_capacity_then_denied() {
        let limiter = RateLimiter::new(3, 1.0);
        for _ in 0..3 {
            assert_eq!(limiter.check("mock_echo"), RateDecision::Allowed);
        }
        assert!(matches!(
            limiter.check("mock_echo"),
            RateDecision::Denied { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn denied_until_retry_after_then_allowed() {
        let limiter = RateLimiter::new(1, 1.0);
        assert_eq!(limiter.check("k"), RateDecision::Allowed);

        let RateDecision::Denied { retry_after_secs } = limiter.check("k") else {
            panic!("expected denial");
        };
        assert_eq!(retry_after_secs, 1);

        // Still denied just before the advertised wait elapses.
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(matches!(limiter.check("k"), RateDecision::Denied { .. }));

        // Allowed after it.
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn refill_caps_at_capacity() {
        let limiter = RateLimiter::new(2, 1.0);
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
        tokio::time::advance(Duration::from_secs(60)).await;

        // Long idle refills to capacity, not beyond: two tokens, then deny.
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
        assert!(matches!(limiter.check("k"), RateDecision::Denied { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 1.0);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert!(matches!(limiter.check("a"), RateDecision::Denied { .. }));
        assert_eq!(limiter.check("b"), RateDecision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_full_capacity() {
        let limiter = RateLimiter::new(2, 0.1);
        limiter.check("k");
        limiter.check("k");
        assert!(matches!(limiter.check("k"), RateDecision::Denied { .. }));

        limiter.reset("k");
        assert_eq!(limiter.check("k"), RateDecision::Allowed);

        limiter.reset_all();
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
    }

    // With a sub-second refill rate, retry_after is the whole-second
    // ceil of the true wait. Callers that sleep exactly retry_after
    // may still race the refill; the value is advisory.
    #[tokio::test(start_paused = true)]
    async fn retry_after_rounds_up_to_whole_seconds() {
        let limiter = RateLimiter::new(1, 0.4);
        assert_eq!(limiter.check("k"), RateDecision::Allowed);
        let RateDecision::Denied { retry_after_secs } = limiter.check("k") else {
            panic!("expected denial");
        };
        // deficit 1.0 at 0.4/s = 2.5s, ceil = 3.
        assert_eq!(retry_after_secs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn status_reports_per_key() {
        let limiter = RateLimiter::new(3, 1.0);
        limiter.check("a");
        limiter.check("a");
        limiter.check("b");

        let status = limiter.status();
        assert_eq!(status["a"].capacity, 3.0);
        assert!(status["a"].available < status["b"].available);
    }
}
