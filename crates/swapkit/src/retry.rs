use std::future::Future;
use std::time::Duration;

use crate::error::QuoteError;

/// Exponential backoff policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            // 3 attempts in total: waits of 1s then 2s, so the 4s step is never reached.
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait before `attempt` (0-indexed). The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error,
/// `should_continue` turns false, or the policy's attempts are exhausted.
///
/// `should_continue` is checked before each retry so that a caller whose
/// inputs changed stops paying for backoff on an abandoned request.
pub async fn with_retry<F, Fut, T, C>(
    policy: &RetryPolicy,
    operation_name: &str,
    should_continue: C,
    mut operation: F,
) -> Result<T, QuoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QuoteError>>,
    C: Fn() -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt);
            tracing::warn!(
                "retry {}/{} for '{}' in {:?}",
                attempt,
                max_attempts - 1,
                operation_name,
                delay
            );
            tokio::time::sleep(delay).await;
            if !should_continue() {
                return Err(QuoteError::Fetch("request abandoned".to_string()));
            }
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!("'{}' succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt + 1 < max_attempts => {
                tracing::warn!(
                    "'{}' failed (attempt {}/{}): {}",
                    operation_name,
                    attempt + 1,
                    max_attempts,
                    e
                );
                attempt += 1;
            }
            Err(e) => {
                if attempt > 0 {
                    tracing::error!(
                        "'{}' failed after {} attempts: {}",
                        operation_name,
                        attempt + 1,
                        e
                    );
                }
                return Err(e);
            }
        }
    }
}
