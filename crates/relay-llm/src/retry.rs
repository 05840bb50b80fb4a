//! Retry Controller: bounded sequential attempts with backoff

use std::future::Future;

use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::error::GatewayError;

/// One try against a provider
#[derive(Debug, Clone)]
pub struct Attempt {
    /// Zero-based attempt number
    pub index: u32,
    pub provider: String,
    pub started_at: Instant,
}

/// Drives attempts until one succeeds, one fails for good, or the budget runs out
#[derive(Debug, Clone)]
pub struct RetryController {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryController {
    /// `max_attempts` below one is raised to one
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `attempt_fn` until it succeeds or fails with a non-retryable error
    ///
    /// Attempts are strictly sequential. After a retryable failure the
    /// controller sleeps `backoff.delay(index)` unless that was the last
    /// attempt. Whatever state the attempt built is dropped with its future,
    /// so each attempt starts from scratch.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error as-is, or
    /// `GatewayError::RetriesExhausted` once every attempt failed.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut attempt_fn: F) -> Result<T, GatewayError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut last_error = None;

        for index in 0..self.max_attempts {
            let attempt = Attempt {
                index,
                provider: provider.to_owned(),
                started_at: Instant::now(),
            };

            match attempt_fn(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        provider,
                        attempt = index + 1,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "upstream attempt failed"
                    );

                    if index + 1 < self.max_attempts {
                        let delay = self.backoff.delay(index);
                        tracing::debug!(provider, delay_ms = delay.as_millis(), "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }

                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(GatewayError::RetriesExhausted {
            attempts: self.max_attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}
