//! Retry policy and predicates for handling transient failures.
//!
//! A [`RetryPolicy`] travels with every [`RequestSpec`](crate::RequestSpec).
//! The queue re-sends a failed request immediately, growing the per-attempt
//! timeout by the backoff multiplier, until the retry budget is spent.

use crate::Error;
use std::time::Duration;

/// Timeout used when no other value is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Number of retries attempted after the initial request.
pub const DEFAULT_MAX_RETRIES: usize = 1;

/// Factor by which the timeout grows on each retry.
pub const DEFAULT_BACKOFF_MULTIPLIER: f32 = 1.0;

/// Timeout and retry parameters for a single request.
///
/// # Examples
///
/// ```
/// use callqueue::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(Duration::from_millis(1000), 2, 1.0);
///
/// // 1000ms, then 1000 + 1000 * 1.0, then 2000 + 2000 * 1.0
/// assert_eq!(policy.timeout_for_attempt(1), Some(Duration::from_millis(1000)));
/// assert_eq!(policy.timeout_for_attempt(2), Some(Duration::from_millis(2000)));
/// assert_eq!(policy.timeout_for_attempt(3), Some(Duration::from_millis(4000)));
/// assert_eq!(policy.timeout_for_attempt(4), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    timeout: Duration,
    max_retries: usize,
    backoff_multiplier: f32,
}

impl RetryPolicy {
    /// Creates a policy. Negative or non-finite multipliers are treated as `0.0`.
    pub fn new(timeout: Duration, max_retries: usize, backoff_multiplier: f32) -> Self {
        let backoff_multiplier = if backoff_multiplier.is_finite() && backoff_multiplier > 0.0 {
            backoff_multiplier
        } else {
            0.0
        };
        Self {
            timeout,
            max_retries,
            backoff_multiplier,
        }
    }

    /// Creates a policy with the default retry count and multiplier.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_MAX_RETRIES, DEFAULT_BACKOFF_MULTIPLIER)
    }

    /// The timeout of the first attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The number of retries after the initial attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// The timeout growth factor.
    pub fn backoff_multiplier(&self) -> f32 {
        self.backoff_multiplier
    }

    /// Returns the timeout for the given attempt, or `None` once the retry
    /// budget is exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number (1-indexed, so 1 = initial request)
    pub fn timeout_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries.saturating_add(1) {
            return None;
        }

        let growth = 1.0 + f64::from(self.backoff_multiplier);
        let mut timeout = self.timeout;
        for _ in 1..attempt {
            let nanos = (timeout.as_nanos() as f64 * growth).round();
            timeout = if nanos >= u64::MAX as f64 {
                Duration::from_nanos(u64::MAX)
            } else {
                Duration::from_nanos(nanos as u64)
            };
        }
        Some(timeout)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }
}

/// Trait for determining whether a failed attempt should be retried.
///
/// # Examples
///
/// ```
/// use callqueue::{Error, RetryPredicate};
///
/// struct RetryOnRateLimit;
///
/// impl RetryPredicate for RetryOnRateLimit {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         matches!(
///             error,
///             Error::HttpError { status, .. } if status.as_u16() == 429
///         )
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Determines whether the request should be retried after `error`.
    ///
    /// `attempt` is the 1-indexed number of the attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retry every error that [`Error::is_retryable`] accepts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

/// Retry only on timeouts.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_timeout()
    }
}

/// Never retry, whatever the policy allows.
#[derive(Debug, Clone, Copy)]
pub struct NeverRetry;

impl RetryPredicate for NeverRetry {
    fn should_retry(&self, _error: &Error, _attempt: usize) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_grows_with_multiplier() {
        let policy = RetryPolicy::new(Duration::from_millis(100), 3, 0.5);

        assert_eq!(
            policy.timeout_for_attempt(1),
            Some(Duration::from_millis(100))
        );
        assert_eq!(
            policy.timeout_for_attempt(2),
            Some(Duration::from_millis(150))
        );
        assert_eq!(
            policy.timeout_for_attempt(3),
            Some(Duration::from_millis(225))
        );
        assert_eq!(policy.timeout_for_attempt(5), None);
    }

    #[test]
    fn test_zero_multiplier_keeps_timeout_constant() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 2, 0.0);

        assert_eq!(policy.timeout_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.timeout_for_attempt(3), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_no_retries_allows_single_attempt() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 0, 1.0);

        assert!(policy.timeout_for_attempt(1).is_some());
        assert_eq!(policy.timeout_for_attempt(2), None);
        assert_eq!(policy.timeout_for_attempt(0), None);
    }

    #[test]
    fn test_invalid_multiplier_is_clamped() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 1, f32::NAN);
        assert_eq!(policy.backoff_multiplier(), 0.0);

        let policy = RetryPolicy::new(Duration::from_secs(1), 1, -2.0);
        assert_eq!(policy.backoff_multiplier(), 0.0);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(policy.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(policy.backoff_multiplier(), DEFAULT_BACKOFF_MULTIPLIER);
    }

    #[test]
    fn test_predicates() {
        assert!(RetryOnRetryable.should_retry(&Error::Timeout, 1));
        assert!(!RetryOnRetryable.should_retry(&Error::NoConnection, 1));
        assert!(RetryOnTimeout.should_retry(&Error::Timeout, 1));
        assert!(!NeverRetry.should_retry(&Error::Timeout, 1));
    }
}
