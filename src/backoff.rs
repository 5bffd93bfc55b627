//! Retry delay state machine for the poller
//!
//! After `n` consecutive failures the next attempt is delayed by
//! `min(base * 2^n, max)`. Rate limiting raises that delay to at least the
//! configured floor (and the source's `Retry-After` hint), still capped at
//! `max`. A success resets the machine and schedules the next poll after
//! `base`.

use crate::error::FetchError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    rate_limit_floor: Duration,
    consecutive_failures: u32,
    current_delay: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, rate_limit_floor: Duration) -> Self {
        Self {
            base,
            max,
            rate_limit_floor,
            consecutive_failures: 0,
            current_delay: base,
        }
    }

    /// Records a success and returns the delay before the next poll
    pub fn on_success(&mut self) -> Duration {
        self.consecutive_failures = 0;
        self.current_delay = self.base;
        self.current_delay
    }

    /// Records a failure and returns the delay before the next attempt
    pub fn on_failure(&mut self, error: &FetchError) -> Duration {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        let mut delay = self.exponential_delay(self.consecutive_failures);
        if let FetchError::RateLimited { retry_after } = error {
            delay = delay.max(self.rate_limit_floor);
            if let Some(hint) = retry_after {
                delay = delay.max(*hint);
            }
        }

        self.current_delay = delay.min(self.max);
        self.current_delay
    }

    /// `min(base * 2^failures, max)` without overflowing
    fn exponential_delay(&self, failures: u32) -> Duration {
        2u32.checked_pow(failures)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn network() -> FetchError {
        FetchError::NetworkFailure("connection refused".to_string())
    }

    #[test]
    fn test_three_failures_double_from_base() {
        let mut backoff = Backoff::new(secs(2), secs(30), secs(10));
        let delays: Vec<_> = (0..3).map(|_| backoff.on_failure(&network())).collect();
        assert_eq!(delays, vec![secs(4), secs(8), secs(16)]);
        assert_eq!(backoff.consecutive_failures(), 3);
    }

    #[test]
    fn test_delay_is_capped_at_max() {
        let mut backoff = Backoff::new(secs(2), secs(30), secs(10));
        for _ in 0..4 {
            backoff.on_failure(&FetchError::Timeout);
        }
        assert_eq!(backoff.current_delay(), secs(30));

        // Far past the point where 2^n would overflow
        for _ in 0..100 {
            backoff.on_failure(&FetchError::Timeout);
        }
        assert_eq!(backoff.current_delay(), secs(30));
    }

    #[test]
    fn test_success_resets_to_base() {
        let mut backoff = Backoff::new(secs(5), secs(60), secs(10));
        backoff.on_failure(&network());
        backoff.on_failure(&network());
        assert_eq!(backoff.on_success(), secs(5));
        assert_eq!(backoff.consecutive_failures(), 0);
        assert_eq!(backoff.on_failure(&network()), secs(10));
    }

    #[test]
    fn test_matches_formula_for_every_n() {
        let base = Duration::from_millis(250);
        let max = secs(45);
        let mut backoff = Backoff::new(base, max, Duration::ZERO);
        for n in 1..=20u32 {
            let expected = (base * 2u32.pow(n)).min(max);
            assert_eq!(backoff.on_failure(&network()), expected, "after {n} failures");
        }
    }

    #[test]
    fn test_rate_limit_uses_floor() {
        let mut backoff = Backoff::new(secs(2), secs(60), secs(20));
        let limited = FetchError::RateLimited { retry_after: None };
        assert_eq!(backoff.on_failure(&limited), secs(20));
        // The exponential term takes over once it exceeds the floor
        backoff.on_failure(&network());
        backoff.on_failure(&network());
        assert_eq!(backoff.on_failure(&limited), secs(32));
    }

    #[test]
    fn test_rate_limit_honors_retry_after_up_to_max() {
        let mut backoff = Backoff::new(secs(2), secs(60), secs(5));
        let hint = FetchError::RateLimited {
            retry_after: Some(secs(42)),
        };
        assert_eq!(backoff.on_failure(&hint), secs(42));

        let huge = FetchError::RateLimited {
            retry_after: Some(secs(3600)),
        };
        assert_eq!(backoff.on_failure(&huge), secs(60));
    }
}
