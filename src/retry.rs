// ABOUTME: Bounded retry of observation-only probes with a fixed delay.
// ABOUTME: Returns the first success or the last error together with the attempt count.

use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::ConfigError;

/// How often and how patiently to retry. Fixed for the duration of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRetryPolicy")]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRetryPolicy {
    max_attempts: u32,
    #[serde(with = "humantime_serde")]
    delay: Duration,
}

impl TryFrom<RawRetryPolicy> for RetryPolicy {
    type Error = ConfigError;

    fn try_from(raw: RawRetryPolicy) -> Result<Self, Self::Error> {
        RetryPolicy::new(raw.max_attempts, raw.delay)
    }
}

impl RetryPolicy {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetryPolicy` when `max_attempts` is zero.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy);
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// A single attempt with no delay.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    /// Connectivity checks: 5 attempts, 30 seconds apart.
    pub fn connectivity() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(30),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Every attempt failed.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: std::error::Error> {
    pub attempts: u32,
    pub last_error: E,
}

/// Invoke `probe` until it succeeds or `policy.max_attempts` is reached,
/// sleeping `policy.delay` between attempts.
///
/// The probe must be safe to repeat. Never use this for mutating operations.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    description: &str,
    mut probe: F,
) -> Result<T, RetryExhausted<E>>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match probe().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(description, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                tracing::warn!(description, attempts = attempt, error = %e, "retries exhausted");
                return Err(RetryExhausted {
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                tracing::debug!(
                    description,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "attempt failed; retrying in {:?}",
                    policy.delay
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
