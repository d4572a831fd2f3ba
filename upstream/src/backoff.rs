use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffError {
    #[error("max retries, base delay and cap delay must all be greater than zero")]
    InvalidConfiguration,
    #[error("retry limit of {0} exceeded")]
    RetryLimitExceeded(u32),
}

/// Capped exponential backoff.
///
/// The n-th call to [`BackoffPolicy::next_delay`] yields
/// `min(base_delay * (2^n - 1), cap_delay)` for n in `1..=max_retries`. The
/// following call fails with [`BackoffError::RetryLimitExceeded`].
///
/// A policy is single-use state. Retry loops clone a fresh policy rather than
/// sharing one.
#[derive(Clone, Debug)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    cap_delay: Duration,
    attempt: u32,
    // Always 2^attempt - 1, saturating.
    multiplier: u32,
}

impl BackoffPolicy {
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        cap_delay: Duration,
    ) -> Result<Self, BackoffError> {
        if max_retries == 0 || base_delay.is_zero() || cap_delay.is_zero() {
            return Err(BackoffError::InvalidConfiguration);
        }

        Ok(BackoffPolicy {
            max_retries,
            base_delay,
            cap_delay,
            attempt: 0,
            multiplier: 0,
        })
    }

    pub fn next_delay(&mut self) -> Result<Duration, BackoffError> {
        if self.is_exhausted() {
            return Err(BackoffError::RetryLimitExceeded(self.max_retries));
        }

        self.attempt += 1;
        self.multiplier = self.multiplier.saturating_mul(2).saturating_add(1);

        Ok(self
            .base_delay
            .saturating_mul(self.multiplier)
            .min(self.cap_delay))
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_retries
    }

    /// Number of delays handed out so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
