//! Retry Policy for Reasoning Calls
//!
//! Wraps a single service call and decides, per failure, whether to try again.
//!
//! ## Strategy
//!
//! 1. Rate-limited: sleep `min(2^attempt * base + jitter, cap)`, then retry
//! 2. Malformed output: retry immediately, only when the policy allows it
//! 3. Anything else: return the error at once
//!
//! The retry bound counts retries, so a permanently throttled call is attempted
//! `max_retries + 1` times before the last error is returned.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::config::PipelineConfig;
use crate::constants::retry as retry_constants;
use crate::types::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Whether malformed responses are retried
    pub retry_malformed: bool,
    pub base_delay: Duration,
    pub max_jitter: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(retry_constants::EXTRACTION_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_malformed: false,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_jitter: Duration::from_millis(retry_constants::MAX_JITTER_MS),
            max_delay: Duration::from_millis(retry_constants::MAX_DELAY_MS),
        }
    }

    /// Stage 0 policy: bound from config, malformed output retried
    pub fn prefilter(config: &PipelineConfig) -> Self {
        Self::new(config.prefilter_max_retries)
            .allow_malformed()
            .with_backoff_from(config)
    }

    /// Stage 1-3 policy: bound from config, rate limits only
    pub fn extraction(config: &PipelineConfig) -> Self {
        Self::new(config.extraction_max_retries).with_backoff_from(config)
    }

    pub fn allow_malformed(mut self) -> Self {
        self.retry_malformed = true;
        self
    }

    pub fn with_backoff(mut self, base: Duration, jitter: Duration, cap: Duration) -> Self {
        self.base_delay = base;
        self.max_jitter = jitter;
        self.max_delay = cap;
        self
    }

    fn with_backoff_from(self, config: &PipelineConfig) -> Self {
        self.with_backoff(
            Duration::from_millis(config.retry_base_delay_ms),
            Duration::from_millis(config.retry_max_jitter_ms),
            Duration::from_millis(config.retry_max_delay_ms),
        )
    }

    /// Policy with every delay zeroed
    pub fn immediate(mut self) -> Self {
        self.base_delay = Duration::ZERO;
        self.max_jitter = Duration::ZERO;
        self.max_delay = Duration::ZERO;
        self
    }

    /// Delay before retry number `attempt` (1-based), without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }

    fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.backoff_delay(attempt) + random_jitter(self.max_jitter);
        let floor = retry_after.unwrap_or(Duration::ZERO);
        std::cmp::min(std::cmp::max(computed, floor), self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry bound is spent. `label` identifies the unit in log lines.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempt >= self.max_retries {
                return Err(err);
            }

            let category = err.category();
            if category.is_rate_limited() {
                attempt += 1;
                let delay = self.delay_for(attempt, err.retry_after());
                warn!(
                    unit = label,
                    attempt,
                    max = self.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, retrying ({}/{})",
                    attempt,
                    self.max_retries
                );
                sleep(delay).await;
            } else if category.is_malformed() && self.retry_malformed {
                attempt += 1;
                warn!(
                    unit = label,
                    attempt,
                    max = self.max_retries,
                    error = %err,
                    "Malformed response, retrying ({}/{})",
                    attempt,
                    self.max_retries
                );
            } else {
                return Err(err);
            }
        }
    }
}

/// Uniform jitter in `[0, max]`
fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorCategory, FeatureMapError, LlmError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn failing(category: ErrorCategory) -> FeatureMapError {
        LlmError::new(category, "scripted failure").into()
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(4000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(8000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(16000));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(30000));
        assert_eq!(policy.backoff_delay(64), Duration::from_millis(30000));
    }

    #[test]
    fn test_delay_stays_within_bounds() {
        let policy = RetryPolicy::new(3);
        for _ in 0..50 {
            let delay = policy.delay_for(1, None);
            assert!(delay >= Duration::from_millis(4000));
            assert!(delay <= Duration::from_millis(5000));
        }
        assert_eq!(policy.delay_for(5, None), Duration::from_millis(30000));
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(120))),
            Duration::from_millis(30000)
        );
    }

    #[test]
    fn test_random_jitter() {
        assert_eq!(random_jitter(Duration::ZERO), Duration::ZERO);
        assert!(random_jitter(Duration::from_millis(1000)) <= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_permanent_rate_limit_attempts_max_plus_one() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3).immediate();

        let result: Result<()> = policy
            .run("a.js", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(failing(ErrorCategory::RateLimit))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_success_on_attempt_k() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3).immediate();

        let result = policy
            .run("b.js", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(failing(ErrorCategory::RateLimit))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3).allow_malformed().immediate();

        let result: Result<()> = policy
            .run("c.py", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(failing(ErrorCategory::Auth))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_retried_only_when_allowed() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let strict = RetryPolicy::new(2).immediate();
        let _ = strict
            .run("chunk 1", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(failing(ErrorCategory::ParseError))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        calls.store(0, Ordering::SeqCst);
        let lenient = RetryPolicy::new(2).allow_malformed().immediate();
        let _ = lenient
            .run("chunk 1", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(failing(ErrorCategory::ParseError))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_policies_from_config() {
        let config = PipelineConfig::default();
        let prefilter = RetryPolicy::prefilter(&config);
        assert_eq!(prefilter.max_retries, 2);
        assert!(prefilter.retry_malformed);

        let extraction = RetryPolicy::extraction(&config);
        assert_eq!(extraction.max_retries, 3);
        assert!(!extraction.retry_malformed);
        assert_eq!(extraction.base_delay, Duration::from_millis(2000));
    }
}
