//! Retry with exponential back-off for provider calls.
//!
//! [`RetryPolicy::run`] wraps any fallible async operation. Errors classified
//! as transient by [`Retryable`] are retried after a back-off sleep; terminal
//! errors are returned immediately after a single attempt.

use std::future::Future;
use std::time::Duration;

/// Classification the retry loop needs from an error type.
pub trait Retryable {
    /// `true` when the same call may succeed if repeated later.
    fn is_transient(&self) -> bool;

    /// Minimum wait the provider asked for, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// The last error of a failed call, tagged with how many attempts were made.
#[derive(Debug)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plural = if self.attempts == 1 { "" } else { "s" };
        write!(f, "{} (after {} attempt{plural})", self.error, self.attempts)
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// A successful value and the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay: the n-th retry waits `backoff_base * 2^(n-1)`.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Upper bound on any single back-off sleep.
    pub const MAX_DELAY: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Back-off before retry number `retry` (1-based):
    ///
    /// | Retry | Sleep (base = 1 s) |
    /// |-------|--------------------|
    /// | 1     | 1 s                |
    /// | 2     | 2 s                |
    /// | 3     | 4 s                |
    ///
    /// Capped at [`Self::MAX_DELAY`].
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(20);
        self.backoff_base
            .saturating_mul(1u32 << exponent)
            .min(Self::MAX_DELAY)
    }

    /// Runs `operation` until it succeeds, fails terminally, or exhausts
    /// `max_retries` additional attempts.
    ///
    /// When a transient error names a provider wait (`retry_after`), the
    /// sleep is the larger of that wait and the back-off.
    ///
    /// # Errors
    ///
    /// Returns the last error verbatim inside a [`RetryError`] carrying the
    /// total attempt count.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<Retried<T>, RetryError<E>>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match operation().await {
                Ok(value) => return Ok(Retried { value, attempts }),
                Err(error) => {
                    let retry = attempts;
                    if !error.is_transient() || retry > self.max_retries {
                        return Err(RetryError { error, attempts });
                    }
                    let backoff = self.delay_for(retry);
                    let delay = error
                        .retry_after()
                        .map_or(backoff, |wait| wait.max(backoff))
                        .min(Self::MAX_DELAY);
                    tracing::warn!(
                        attempt = attempts,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "transient provider error, retrying after back-off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
