//! Retry policy and clock abstraction for the gateway

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay after every failed attempt
    #[default]
    Fixed,
    /// Delay doubles after every failed attempt, capped at the maximum
    Exponential,
}

/// Bounded retry policy
///
/// `max_attempts` counts every call, including the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Growth of the delay
    pub backoff: Backoff,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(3),
            backoff: Backoff::Fixed,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits (for tests and dry runs)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// Returns `None` once no attempts remain.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use triplex_llm::{Backoff, RetryPolicy};
    ///
    /// let policy = RetryPolicy {
    ///     max_attempts: 4,
    ///     base_delay: Duration::from_secs(2),
    ///     backoff: Backoff::Exponential,
    ///     max_delay: Duration::from_secs(5),
    /// };
    /// assert_eq!(policy.delay_after(1), Some(Duration::from_secs(2)));
    /// assert_eq!(policy.delay_after(2), Some(Duration::from_secs(4)));
    /// assert_eq!(policy.delay_after(3), Some(Duration::from_secs(5)));
    /// assert_eq!(policy.delay_after(4), None);
    /// ```
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                self.base_delay.saturating_mul(factor)
            }
        };

        Some(delay.min(self.max_delay.max(self.base_delay)))
    }

    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Something that can wait
///
/// Injected into the gateway so retry timing is testable without a clock.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    /// Wait for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
