//! Timeout and bounded retry around completion calls.

use crate::RetrySettings;
use fabula_core::{GenerateRequest, GenerateResponse};
use fabula_error::{FabulaError, FabulaResult, ModelsError, ModelsErrorKind};
use fabula_interface::CompletionDriver;
use std::future::Future;
use std::time::Duration;
use tokio_retry2::strategy::{ExponentialBackoff, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Backoff schedule and timeout applied to every completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(
        max_retries: usize,
        initial_backoff: Duration,
        max_backoff: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            timeout,
        }
    }

    /// A policy that never waits between attempts. Useful in tests.
    pub fn immediate(max_retries: usize) -> Self {
        Self::new(
            max_retries,
            Duration::ZERO,
            Duration::ZERO,
            Duration::from_secs(30),
        )
    }

    /// Retries after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = self.initial_backoff.as_millis().max(1) as u64;
        let zero = self.initial_backoff.is_zero();
        ExponentialBackoff::from_millis(initial_ms)
            .factor(2)
            .max_delay(self.max_backoff)
            .map(jitter)
            .map(move |d| if zero { Duration::ZERO } else { d })
            .take(self.max_retries)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            *settings.max_retries(),
            Duration::from_millis(*settings.initial_backoff_ms()),
            Duration::from_millis(*settings.max_backoff_ms()),
            Duration::from_secs(*settings.timeout_secs()),
        )
    }
}

/// Whether a failed call is worth repeating.
pub fn is_transient(err: &FabulaError) -> bool {
    err.models().is_some_and(|e| e.kind.is_retryable())
}

/// Run one completion call under the policy's timeout.
///
/// # Errors
///
/// Returns the driver's error, or a `Timeout` backend error when the call
/// does not finish in time.
pub async fn generate_with_timeout<D>(
    driver: &D,
    req: &GenerateRequest,
    timeout: Duration,
) -> FabulaResult<GenerateResponse>
where
    D: CompletionDriver + ?Sized,
{
    match tokio::time::timeout(timeout, driver.generate(req)).await {
        Ok(result) => result,
        Err(_) => Err(ModelsError::new(ModelsErrorKind::Timeout(timeout.as_secs())).into()),
    }
}

/// Retry `op` per the policy.
///
/// `op` receives the 1-based attempt number and signals whether a failure
/// is transient (retry) or permanent (stop) through [`RetryError`].
///
/// # Errors
///
/// Returns the last error once retries are exhausted or on the first
/// permanent failure.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FabulaError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RetryError<FabulaError>>>,
{
    let mut attempt = 0u32;
    Retry::spawn(policy.strategy(), move || {
        attempt += 1;
        op(attempt)
    })
    .await
}

/// Generate with timeout and retry on transient backend failures.
///
/// # Errors
///
/// Returns the last backend error once retries are exhausted.
pub async fn generate_with_retry<D>(
    driver: &D,
    req: &GenerateRequest,
    policy: &RetryPolicy,
) -> FabulaResult<GenerateResponse>
where
    D: CompletionDriver + ?Sized,
{
    retry(policy, |attempt| async move {
        debug!(attempt, "Sending completion request");
        match generate_with_timeout(driver, req, policy.timeout()).await {
            Ok(response) => Ok(response),
            Err(err) if is_transient(&err) => {
                warn!(attempt, error = %err, "Transient completion failure");
                Err(RetryError::Transient {
                    err,
                    retry_after: None,
                })
            }
            Err(err) => Err(RetryError::Permanent(err)),
        }
    })
    .await
}
