//! Exponential backoff for transient network failures

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::clock::Clock;

/// Errors that can tell whether another attempt might succeed
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Retry policy: `max_attempts` tries, waiting `base_delay * 2^attempt` in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the failed attempt with 0-based index `attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// runs out of attempts. The last error is returned unchanged.
pub async fn with_backoff<T, E, F, Fut>(
    clock: &dyn Clock,
    policy: BackoffPolicy,
    mut operation: F,
) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if attempt + 1 >= policy.max_attempts {
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                debug!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, backing off: {}",
                    e
                );
                clock.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
