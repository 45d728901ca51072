//! Retry and backoff policy for page fetches.
//!
//! Only transient transport failures are retried (see
//! [`FetchError::is_retriable`]). Blocks and invalid URLs surface on the
//! first attempt. The schedule is explicit state so it can be stepped
//! through without a network.

use std::future::Future;
use std::time::Duration;

use bizscout_core::ScraperSettings;

use crate::error::FetchError;

/// Attempt budget and exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` is treated as `1`.
    pub attempts: u32,
    pub base_secs: f64,
    pub factor: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_settings(settings: &ScraperSettings) -> Self {
        Self {
            attempts: settings.http_retry_attempts,
            base_secs: settings.http_retry_backoff_seconds,
            factor: settings.http_retry_backoff_factor,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Delay before retry `n` (1-based): `base * factor^(n-1)`.
    ///
    /// Non-finite or negative products collapse to zero.
    #[must_use]
    pub fn delay_before_retry(&self, n: u32) -> Duration {
        let exponent = i32::try_from(n.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_secs * self.factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then make attempt number `next_attempt` (1-based).
    Retry { next_attempt: u32, delay: Duration },
    /// Give up and surface the last error.
    Stop,
}

/// Per-URL retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryState {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Number of attempts that have failed so far.
    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failed attempt and decides whether another one follows.
    pub fn record_failure(&mut self, retriable: bool) -> RetryDecision {
        self.failures += 1;
        if !retriable || self.failures >= self.policy.max_attempts() {
            return RetryDecision::Stop;
        }
        RetryDecision::Retry {
            next_attempt: self.failures + 1,
            delay: self.policy.delay_before_retry(self.failures),
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retriable error, or
/// the attempt budget is spent.
///
/// `on_backoff` is invoked with the upcoming attempt number, the delay and
/// the error that triggered it, before each sleep.
pub(crate) async fn retry_with_backoff<T, F, Fut, B>(
    policy: RetryPolicy,
    mut on_backoff: B,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    B: FnMut(u32, Duration, &FetchError),
{
    let mut state = RetryState::new(policy);

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match state.record_failure(err.is_retriable()) {
            RetryDecision::Stop => return Err(err),
            RetryDecision::Retry {
                next_attempt,
                delay,
            } => {
                on_backoff(next_attempt, delay, &err);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
