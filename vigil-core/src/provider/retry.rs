//! Retry policy for provider calls
//!
//! Exponential backoff for transient transport failures. Retries apply to
//! the same provider only; failover to the next provider is the
//! orchestrator's decision.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts per provider (first call included)
    pub max_attempts: usize,

    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,

    /// Cap on the delay between attempts
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Add up to 25% jitter to spread concurrent retries
    pub add_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(4),
            add_jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set max attempts
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Builder: set max delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Builder: enable/disable jitter
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculate delay before the retry following attempt `attempt`
    /// (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);

        let clamped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.add_jitter {
            // Up to 25% jitter; delays stay non-decreasing across attempts
            let jitter = clamped_delay * 0.25 * rand_jitter();
            clamped_delay + jitter
        } else {
            clamped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0)
/// Uses a simple LCG for determinism in tests
fn rand_jitter() -> f64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static SEED: AtomicU64 = AtomicU64::new(0);

    const A: u64 = 1103515245;
    const C: u64 = 12345;
    const M: u64 = 1 << 31;

    let seed = SEED.fetch_add(1, Ordering::Relaxed);
    let time_component = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let combined = seed.wrapping_add(time_component);
    let next = (A.wrapping_mul(combined).wrapping_add(C)) % M;

    (next as f64) / (M as f64)
}

/// Retry state tracker for one provider's attempt loop
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: usize,
    last_error: Option<String>,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: 0,
            last_error: None,
        }
    }

    /// Check if another attempt is allowed
    pub fn should_retry(&self) -> bool {
        self.attempt < self.policy.max_attempts
    }

    /// Record a failed attempt
    pub fn record_attempt(&mut self, error: impl Into<String>) {
        self.attempt += 1;
        self.last_error = Some(error.into());
    }

    /// Delay before the next retry
    pub fn next_delay(&self) -> Duration {
        // attempt was already incremented for the failure that triggered
        // this delay, so subtract one to index from the initial delay
        self.policy.delay_for_attempt(self.attempt.saturating_sub(1))
    }

    /// Attempts made so far
    pub fn attempts_made(&self) -> usize {
        self.attempt
    }

    /// Last recorded error
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_delay_sequence_is_exponential_and_capped() {
        let policy = RetryPolicy::default().with_jitter(false);

        // 1s, 2s, then capped at 4s
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(4));
    }

    #[test]
    fn test_delays_are_non_decreasing_with_jitter() {
        let policy = RetryPolicy::default().with_jitter(true);

        // Jitter adds at most 25%, which never overtakes the next doubling,
        // so delays below the cap stay non-decreasing.
        for _ in 0..20 {
            let mut previous = Duration::ZERO;
            for attempt in 0..3 {
                let delay = policy.delay_for_attempt(attempt);
                assert!(delay >= previous);
                previous = delay;
            }
        }
    }

    #[test]
    fn test_retry_state_exhausts() {
        let mut state = RetryState::new(RetryPolicy::default().with_max_attempts(3));

        assert!(state.should_retry());
        state.record_attempt("error 1");
        assert!(state.should_retry());
        state.record_attempt("error 2");
        assert!(state.should_retry());
        state.record_attempt("error 3");
        assert!(!state.should_retry());
        assert_eq!(state.attempts_made(), 3);
        assert_eq!(state.last_error(), Some("error 3"));
    }

    #[test]
    fn test_next_delay_starts_at_initial() {
        let mut state = RetryState::new(
            RetryPolicy::default()
                .with_jitter(false)
                .with_initial_delay(Duration::from_millis(100)),
        );
        state.record_attempt("first failure");
        assert_eq!(state.next_delay(), Duration::from_millis(100));
        state.record_attempt("second failure");
        assert_eq!(state.next_delay(), Duration::from_millis(200));
    }
}
