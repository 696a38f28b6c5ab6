// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retry with exponential backoff for remote calls
//!
//! Failures are classified by the error itself: rejections the remote side
//! will keep returning (bad request, unauthorized) fail immediately, anything
//! else is retried after `base_delay * 2^attempt` unless the error carries an
//! explicit retry-after hint.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// How a failed attempt should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Do not retry; surface the error to the caller now
    Fatal,
    /// Retry, honoring the server's hint when present
    Transient { retry_after: Option<Duration> },
}

/// Errors that know whether they are worth retrying
pub trait Retryable {
    fn classify(&self) -> RetryClass;
}

/// Retry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure; doubles each attempt
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Outcome of a call that could not be completed
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("{operation} rejected: {source}")]
    Fatal {
        operation: String,
        #[source]
        source: E,
    },
    #[error("{operation} failed after {attempts} attempts")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// True when the remote side refused the request outright
    pub fn is_fatal(&self) -> bool {
        matches!(self, RetryError::Fatal { .. })
    }
}

/// Run `f` until it succeeds, fails fatally, or the policy is exhausted
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::error::Error + 'static,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let err = match f().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let retry_after = match err.classify() {
            RetryClass::Fatal => {
                tracing::error!(operation, error = %err, "request rejected, not retrying");
                return Err(RetryError::Fatal {
                    operation: operation.to_string(),
                    source: err,
                });
            }
            RetryClass::Transient { retry_after } => retry_after,
        };

        let delay = retry_after.unwrap_or_else(|| policy.backoff(attempt));
        tracing::warn!(
            operation,
            attempt = attempt + 1,
            max_attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "request failed, retrying"
        );
        tokio::time::sleep(delay).await;

        attempt += 1;
        if attempt >= attempts {
            tracing::error!(operation, attempts, "all retries failed");
            return Err(RetryError::Exhausted {
                operation: operation.to_string(),
                attempts,
                last: err,
            });
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
