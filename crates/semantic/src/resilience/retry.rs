//! Retry logic with exponential backoff for transient failures.

use std::future::Future;
use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Base delay between retries (exponentially increased).
    #[serde(rename = "base_delay_ms", with = "crate::serde_millis")]
    pub base_delay: Duration,
    /// Maximum delay between retries.
    #[serde(rename = "max_delay_ms", with = "crate::serde_millis")]
    pub max_delay: Duration,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Result of a retry operation.
#[derive(Debug, Clone)]
pub struct RetryResult<T> {
    /// The final result (Ok if succeeded, Err with the last error otherwise).
    pub result: Result<T, String>,
    /// Number of attempts made (1 = no retries needed).
    pub attempts: u32,
    /// Total duration spent on all attempts.
    pub total_duration: Duration,
}

impl<T> RetryResult<T> {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T, String> {
        self.result
    }
}

/// Execute an async operation, retrying transient failures.
///
/// Errors rejected by [`is_retryable_error`] end the loop immediately.
pub async fn execute_with_retry_async<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> RetryResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let start = Instant::now();
    let mut last_error = String::from("no attempts made");
    let mut attempts = 0;

    for attempt in 0..=config.max_retries {
        attempts = attempt + 1;
        match operation(attempt).await {
            Ok(value) => {
                return RetryResult {
                    result: Ok(value),
                    attempts,
                    total_duration: start.elapsed(),
                };
            }
            Err(error) => {
                let retryable = is_retryable_error(&error);
                last_error = error;
                if !retryable || attempt == config.max_retries {
                    break;
                }
                tracing::debug!(attempt, error = %last_error, "embedding_retry");
                tokio::time::sleep(calculate_delay(config, attempt)).await;
            }
        }
    }

    RetryResult {
        result: Err(last_error),
        attempts,
        total_duration: start.elapsed(),
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let base = config.base_delay.as_millis() as u64;
    let exponential = base.saturating_mul(2_u64.saturating_pow(attempt));
    let delay = exponential.min(config.max_delay.as_millis() as u64);

    if config.jitter {
        // 0-50% jitter
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay + jitter)
    } else {
        Duration::from_millis(delay)
    }
}

/// Check if an error is retryable (transient).
pub fn is_retryable_error(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    if error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("reset")
        || error_lower.contains("temporarily")
        || error_lower.contains("unavailable")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("429")
        || error_lower.contains("504")
        || error_lower.contains("408")
    {
        return true;
    }

    if error_lower.contains("401")
        || error_lower.contains("403")
        || error_lower.contains("404")
        || error_lower.contains("400")
        || error_lower.contains("invalid")
        || error_lower.contains("malformed")
        || error_lower.contains("not found")
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::default()
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[tokio::test]
    async fn retry_succeeds_eventually() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry_async(&fast().with_max_retries(3), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("HTTP 503".to_string())
                } else {
                    Ok("embedded")
                }
            }
        })
        .await;

        assert!(result.succeeded());
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap(), "embedded");
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let result: RetryResult<()> =
            execute_with_retry_async(&fast().with_max_retries(2), |_| async {
                Err("connection reset".to_string())
            })
            .await;

        assert!(!result.succeeded());
        assert_eq!(result.attempts, 3);
        assert_eq!(result.into_result().unwrap_err(), "connection reset");
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let result: RetryResult<()> =
            execute_with_retry_async(&fast().with_max_retries(5), |_| async {
                Err("HTTP 401 invalid api key".to_string())
            })
            .await;

        assert_eq!(result.attempts, 1);
        assert!(!result.succeeded());
    }

    #[test]
    fn delay_is_capped() {
        let cfg = RetryConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250))
            .with_jitter(false);
        assert_eq!(calculate_delay(&cfg, 0), Duration::from_millis(100));
        assert_eq!(calculate_delay(&cfg, 1), Duration::from_millis(200));
        assert_eq!(calculate_delay(&cfg, 5), Duration::from_millis(250));
    }

    #[test]
    fn is_retryable_error_detection() {
        assert!(is_retryable_error("timeout"));
        assert!(is_retryable_error("connection reset"));
        assert!(is_retryable_error("HTTP 503"));
        assert!(is_retryable_error("HTTP 429"));
        assert!(is_retryable_error("service temporarily unavailable"));

        assert!(!is_retryable_error("HTTP 400"));
        assert!(!is_retryable_error("HTTP 401"));
        assert!(!is_retryable_error("HTTP 404"));
        assert!(!is_retryable_error("invalid api key"));
    }
}
