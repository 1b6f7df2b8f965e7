//! Property-based tests: token bucket invariants.

use proptest::prelude::*;
use relay_registry::{RateDecision, RateLimiter};

proptest! {
    /// A burst of immediate checks is allowed exactly capacity times.
    /// The refill rate is kept tiny so wall-clock time between checks
    /// cannot mint a token mid-test.
    #[test]
    fn burst_allows_exactly_capacity(
        capacity in 1u32..20,
        checks in 0usize..60,
    ) {
        let limiter = RateLimiter::new(capacity, 1e-6);
        let allowed = (0..checks)
            .filter(|_| limiter.check("k") == RateDecision::Allowed)
            .count();
        prop_assert_eq!(allowed, checks.min(capacity as usize));
    }

    /// Once denied, an immediate re-check is denied too, and the
    /// advertised wait never shrinks below a second.
    #[test]
    fn denial_is_stable_without_refill(capacity in 1u32..10) {
        let limiter = RateLimiter::new(capacity, 1e-6);
        for _ in 0..capacity {
            prop_assert_eq!(limiter.check("k"), RateDecision::Allowed);
        }
        let RateDecision::Denied { retry_after_secs } = limiter.check("k") else {
            return Err(TestCaseError::fail("expected denial"));
        };
        prop_assert!(retry_after_secs >= 1);
        let still_denied = matches!(limiter.check("k"), RateDecision::Denied { .. });
        prop_assert!(still_denied);
    }

    /// Keys never interfere: exhausting one leaves another untouched.
    #[test]
    fn keys_are_isolated(capacity in 1u32..10) {
        let limiter = RateLimiter::new(capacity, 1e-6);
        for _ in 0..capacity + 5 {
            limiter.check("hot");
        }
        prop_assert_eq!(limiter.check("cold"), RateDecision::Allowed);
    }
}
