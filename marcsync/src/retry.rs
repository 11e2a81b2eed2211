//! Bounded retry for transient remote failures.
//!
//! Only the remote directory listing is retried. Transfers and local I/O are
//! never retried inside a run; the next scheduled run is the retry for those.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use marcsync::retry::RetryPolicy;
//!
//! // 3 attempts, waiting 10s then 20s between them
//! let policy = RetryPolicy::linear(3, Duration::from_secs(10));
//! assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_secs(10)));
//! assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_secs(20)));
//! assert_eq!(policy.delay_for_attempt(3), None);
//! ```

use std::time::Duration;

use tracing::warn;

/// Default number of listing attempts (including the first).
pub const DEFAULT_LISTING_ATTEMPTS: u32 = 3;

/// Default backoff step between listing attempts (10 seconds).
pub const DEFAULT_BACKOFF_STEP_SECS: u64 = 10;

/// How an operation handles transient failures.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// No retries - fail immediately on error.
    #[default]
    None,

    /// Linearly increasing delay: `step`, `2 * step`, `3 * step`, ...
    Linear {
        /// Maximum number of attempts (including the initial attempt).
        max_attempts: u32,
        /// Delay after the first failure; later delays are multiples of it.
        step: Duration,
    },
}

impl RetryPolicy {
    /// Creates a linear backoff policy.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum number of attempts (including initial)
    /// * `step` - Delay after the first failure
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self::Linear {
            max_attempts: max_attempts.max(1),
            step,
        }
    }

    /// The policy used for remote listings: 3 attempts, 10s step.
    pub fn listing() -> Self {
        Self::linear(
            DEFAULT_LISTING_ATTEMPTS,
            Duration::from_secs(DEFAULT_BACKOFF_STEP_SECS),
        )
    }

    /// Calculates the delay after a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt that just failed (1-based)
    ///
    /// # Returns
    ///
    /// The delay to wait before the next attempt, or `None` if no attempts
    /// remain.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Linear { max_attempts, step } => {
                if attempt < *max_attempts {
                    Some(*step * attempt)
                } else {
                    None
                }
            }
        }
    }

    /// Returns the maximum number of attempts for this policy.
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::None => 1,
            Self::Linear { max_attempts, .. } => *max_attempts,
        }
    }

    /// Runs `operation` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `is_retriable` classifies errors; a non-retriable error is returned
    /// at once. When attempts are exhausted the last error is returned.
    /// `operation` receives the 1-based attempt number.
    pub fn run<T, E, F, R>(&self, mut operation: F, is_retriable: R) -> Result<T, E>
    where
        F: FnMut(u32) -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !is_retriable(&e) => return Err(e),
                Err(e) => match self.delay_for_attempt(attempt) {
                    Some(delay) => {
                        warn!(
                            attempt,
                            max_attempts = self.max_attempts(),
                            delay_secs = delay.as_secs(),
                            error = %e,
                            "Transient failure, retrying"
                        );
                        if !delay.is_zero() {
                            std::thread::sleep(delay);
                        }
                        attempt += 1;
                    }
                    None => return Err(e),
                },
            }
        }
    }
}
