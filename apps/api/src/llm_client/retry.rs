//! Bounded exponential backoff for a single provider.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::llm_client::{ProviderError, TextProvider};

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_secs(2);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Retry policy shared by the provider wrapper and output re-sampling.
///
/// Delay after failed attempt `k` (0-based) is `min(max_delay, base_delay * 2^k)`:
/// 2s, then 4s, with the default three attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(failed_attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Runs `op` until it succeeds, fails permanently, or exhausts `policy`.
pub async fn with_backoff<T, Fut, Op>(
    policy: &RetryPolicy,
    label: &str,
    mut op: Op,
) -> Result<T, ProviderError>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "{label}: attempt {}/{} failed ({err}), retrying after {}ms...",
                    attempt + 1,
                    max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Wraps one provider with retries. Blank output counts as a transient failure,
/// whatever the backend reported.
pub struct ResilientProvider {
    inner: Arc<dyn TextProvider>,
    policy: RetryPolicy,
}

impl ResilientProvider {
    pub fn new(inner: Arc<dyn TextProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl TextProvider for ResilientProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        with_backoff(&self.policy, self.inner.name(), move || async move {
            let text = self.inner.generate(prompt).await?;
            if text.trim().is_empty() {
                return Err(ProviderError::Transient(
                    "provider returned an empty response".to_string(),
                ));
            }
            Ok(text)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::llm_client::testing::{ok, permanent, transient, ScriptedProvider};

    #[test]
    fn test_delay_schedule_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0), Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(2), Duration::from_secs(8));
        assert_eq!(policy.delay_after(3), Duration::from_secs(10));
        assert_eq!(policy.delay_after(40), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retry_up_to_three_attempts() {
        let provider = ScriptedProvider::always("flaky", transient("HTTP 503"));
        let wrapper = ResilientProvider::new(provider.clone(), RetryPolicy::default());

        let started = Instant::now();
        let err = wrapper.generate("prompt").await.unwrap_err();

        assert!(err.is_transient());
        assert_eq!(provider.calls(), 3);
        // 2s + 4s between the three attempts
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let provider = ScriptedProvider::always("broken", permanent("HTTP 401: bad key"));
        let wrapper = ResilientProvider::new(provider.clone(), RetryPolicy::default());

        let err = wrapper.generate("prompt").await.unwrap_err();

        assert_eq!(err, ProviderError::Permanent("HTTP 401: bad key".to_string()));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let provider =
            ScriptedProvider::scripted("flaky", vec![transient("timeout")], ok("Tell me more."));
        let wrapper = ResilientProvider::new(provider.clone(), RetryPolicy::default());

        assert_eq!(wrapper.generate("prompt").await.unwrap(), "Tell me more.");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_output_is_retried_as_transient() {
        let provider = ScriptedProvider::scripted("blank", vec![ok("   \n")], ok("Why Rust?"));
        let wrapper = ResilientProvider::new(provider.clone(), RetryPolicy::default());

        assert_eq!(wrapper.generate("prompt").await.unwrap(), "Why Rust?");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_backoff_stops_on_permanent_error() {
        let mut calls = 0;
        let result: Result<(), _> = with_backoff(&RetryPolicy::default(), "test", || {
            calls += 1;
            async { Err(ProviderError::Permanent("nope".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
