//! Shared call path for every external request made during a run:
//! per-endpoint rate limiting, retry with back-off, per-call timeout and the
//! run deadline, plus the run's API-call accounting.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::config::CollectorConfig;
use crate::error::ProviderError;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryError, RetryPolicy};

/// Per-run bookkeeping shared by every call in that run.
#[derive(Debug)]
pub(crate) struct RunContext {
    started: Instant,
    deadline: Instant,
    api_calls: AtomicU32,
}

impl RunContext {
    pub(crate) fn new(budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + budget,
            api_calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub(crate) fn expired(&self) -> bool {
        self.remaining().is_zero()
    }

    pub(crate) fn record_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn api_calls(&self) -> u32 {
        self.api_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

pub(crate) type CallResult<T> = Result<T, RetryError<ProviderError>>;

/// Owns one [`RateLimiter`] per endpoint, created on first use and shared by
/// all runs of the orchestrator that owns this dispatcher.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
    quota: usize,
    window: Duration,
    retry: RetryPolicy,
    call_timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(config: &CollectorConfig) -> Self {
        Self {
            limiters: Mutex::new(HashMap::new()),
            quota: config.rate_limit_calls,
            window: config.rate_limit_window,
            retry: config.retry,
            call_timeout: config.call_timeout,
        }
    }

    fn limiter(&self, endpoint: &str) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            limiters
                .entry(endpoint.to_string())
                .or_insert_with(|| Arc::new(RateLimiter::new(self.quota, self.window))),
        )
    }

    /// Runs `op` against `endpoint` (`platform:operation`).
    ///
    /// Each attempt must pass the endpoint's rate limiter (a rejection is a
    /// transient [`ProviderError::RateLimited`], so the retry loop sleeps the
    /// reported wait) and is bounded by the smaller of the call timeout and
    /// the time left in the run. Only admitted attempts count as API calls.
    pub(crate) async fn call<T, F, Fut>(
        &self,
        run: &RunContext,
        endpoint: &str,
        mut op: F,
    ) -> CallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let limiter = self.limiter(endpoint);
        let attempts = AtomicU32::new(0);

        let retried = self.retry.run(|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            let admitted = self.gate(run, &limiter).map(|timeout| {
                run.record_call();
                (timeout, op())
            });
            async move {
                let (timeout, fut) = admitted?;
                tracing::debug!(endpoint, timeout_ms = timeout.as_millis(), "provider call");
                // A timeout clamped to the run deadline is the deadline.
                tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| {
                    Err(if run.expired() {
                        ProviderError::DeadlineExceeded
                    } else {
                        ProviderError::Timeout { after: timeout }
                    })
                })
            }
        });

        match tokio::time::timeout(run.remaining(), retried).await {
            Ok(Ok(done)) => Ok(done.value),
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(RetryError {
                error: ProviderError::DeadlineExceeded,
                attempts: attempts.load(Ordering::Relaxed),
            }),
        }
    }

    fn gate(&self, run: &RunContext, limiter: &RateLimiter) -> Result<Duration, ProviderError> {
        let remaining = run.remaining();
        if remaining.is_zero() {
            return Err(ProviderError::DeadlineExceeded);
        }
        limiter
            .admit()
            .map_err(|e| ProviderError::RateLimited {
                retry_after: e.retry_after,
            })?;
        Ok(self.call_timeout.min(remaining))
    }
}
