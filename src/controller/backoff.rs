//! # Exponential Backoff
//!
//! Per-key rate limiting for failed reconciliations.
//!
//! The delay doubles on every consecutive failure, starting from a base delay
//! and capped at a maximum. A successful cycle resets the sequence.
//!
//! ## Usage
//!
//! ```rust
//! use kcm_operator::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(Duration::from_millis(5), Duration::from_secs(1000));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(5));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(10));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(20));
//! ```

use std::time::Duration;

/// Exponential backoff calculator
///
/// Delay for the n-th consecutive failure (zero-based) is `base * 2^n`,
/// never exceeding `max`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay after the first failure
    base: Duration,
    /// Upper bound for any delay
    max: Duration,
    /// Consecutive failures since the last reset
    failures: u32,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff
    ///
    /// # Arguments
    ///
    /// * `base` - Delay returned for the first failure
    /// * `max` - Cap applied to every delay
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Get the next backoff duration and advance the sequence
    ///
    /// # Example
    ///
    /// ```
    /// use kcm_operator::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(3));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(2));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(3));
    /// ```
    pub fn next_backoff(&mut self) -> Duration {
        let delay = 2u32
            .checked_pow(self.failures)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max));
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last reset
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        use crate::constants::{DEFAULT_BACKOFF_MAX_MS, DEFAULT_BACKOFF_START_MS};
        Self::new(
            Duration::from_millis(DEFAULT_BACKOFF_START_MS),
            Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_sequence() {
        let mut backoff = ExponentialBackoff::default();

        assert_eq!(backoff.next_backoff(), Duration::from_millis(5));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(10));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(20));
        assert_eq!(backoff.next_backoff(), Duration::from_millis(40));
        assert_eq!(backoff.failures(), 4);
    }

    #[test]
    fn test_exponential_backoff_max_cap() {
        let mut backoff = ExponentialBackoff::default();

        // 5ms * 2^17 = 655.36s, 5ms * 2^18 = 1310.72s > 1000s
        for _ in 0..18 {
            assert!(backoff.next_backoff() < Duration::from_secs(1000));
        }
        assert_eq!(backoff.next_backoff(), Duration::from_secs(1000));
        // Should stay at max, including once the exponent overflows
        for _ in 0..100 {
            assert_eq!(backoff.next_backoff(), Duration::from_secs(1000));
        }
    }

    #[test]
    fn test_exponential_backoff_reset() {
        let mut backoff = ExponentialBackoff::default();

        backoff.next_backoff();
        backoff.next_backoff();
        backoff.next_backoff();

        backoff.reset();

        // Should restart from beginning after success
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_backoff(), Duration::from_millis(5));
    }
}
