//! Retry policy for failed requests.

use std::time::Duration;

use rand::Rng;

/// Maximum number of retry attempts for failed requests.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff.
const BASE_RETRY_DELAY_MS: u64 = 1000;

/// Upper bound on any single retry delay.
const MAX_RETRY_DELAY_MS: u64 = 8000;

/// Upper bound (exclusive) on the random jitter added to each delay.
const MAX_JITTER_MS: u64 = 1000;

/// Exponential backoff policy with jitter.
///
/// The delay for attempt `n` (0-indexed) is
/// `min(base * 2^n + jitter, max)` where `jitter` is uniform in
/// `[0, max_jitter)`. The jitter spreads simultaneous retries from many
/// clients so they do not hammer a recovering backend in lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Cap applied after jitter.
    pub max_delay: Duration,
    /// Exclusive upper bound of the random jitter.
    pub max_jitter: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::from_millis(BASE_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(MAX_RETRY_DELAY_MS),
            max_jitter: Duration::from_millis(MAX_JITTER_MS),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the jitter bound. `Duration::ZERO` disables jitter.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Calculates the delay before retry attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let exponential = base_ms.saturating_mul(2u64.saturating_pow(attempt));

        let jitter_bound = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if jitter_bound == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..jitter_bound)
        };

        let cap_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(exponential.saturating_add(jitter).min(cap_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_RETRY_ATTEMPTS)
    }
}

// ============================================================================
// Tests
// ============================================================================
