//! Call admission control.
//!
//! [`RateLimiter`] is a sliding-window quota: it never sleeps, it either
//! admits the call or reports how long until the next slot opens, leaving the
//! decision to wait or reject to the caller. [`MinIntervalLimiter`] is the
//! coarser transport-level guard that spaces consecutive requests by a fixed
//! minimum interval regardless of quota.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit exceeded (next slot in {}ms)", .retry_after.as_millis())]
pub struct RateLimitExceeded {
    pub retry_after: Duration,
}

/// Sliding-window limiter admitting at most `quota` calls per `window`.
///
/// Safe to share across tasks: admission checks are serialized by a mutex
/// around the timestamp list.
#[derive(Debug)]
pub struct RateLimiter {
    quota: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A `quota` of zero is treated as one.
    #[must_use]
    pub fn new(quota: usize, window: Duration) -> Self {
        let quota = quota.max(1);
        Self {
            quota,
            window,
            calls: Mutex::new(VecDeque::with_capacity(quota)),
        }
    }

    #[must_use]
    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Admits a call now or fails with the wait until the next slot.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded`] when `quota` calls were already admitted
    /// within the trailing window.
    pub fn admit(&self) -> Result<(), RateLimitExceeded> {
        self.admit_at(Instant::now())
    }

    /// [`Self::admit`] against an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitExceeded`] when the window is full at `now`.
    pub fn admit_at(&self, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);

        while calls
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            calls.pop_front();
        }

        if calls.len() >= self.quota {
            let oldest = calls.front().copied().unwrap_or(now);
            let retry_after = (oldest + self.window).saturating_duration_since(now);
            return Err(RateLimitExceeded { retry_after });
        }

        calls.push_back(now);
        Ok(())
    }
}

/// Enforces a minimum spacing between consecutive calls by sleeping the
/// remainder of the interval before letting the caller proceed.
#[derive(Debug)]
pub struct MinIntervalLimiter {
    min_interval: Duration,
    last_call: tokio::sync::Mutex<Option<Instant>>,
}

impl MinIntervalLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: tokio::sync::Mutex::new(None),
        }
    }

    /// Waits until at least `min_interval` has passed since the previous
    /// call, then records this call. Concurrent callers queue on the lock.
    pub async fn wait(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                tracing::trace!(
                    remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    "spacing transport call"
                );
                tokio::time::sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}
