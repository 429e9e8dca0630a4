//! Bounded retry with exponential backoff for rate-limited requests.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use crate::config::ExportConfig;
use crate::error::Result;

/// Source of delays. Swapped out in tests so retries run instantly.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Records requested delays instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    calls: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(duration);
        }
        Box::pin(std::future::ready(()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Pause between consecutive artifacts of one plan.
    pub inter_request_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ExportConfig::default())
    }
}

impl From<&ExportConfig> for RetryPolicy {
    fn from(config: &ExportConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `initial * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned on exhaustion.
pub async fn with_retry<T, S, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &S,
    what: &str,
    mut op: F,
) -> Result<T>
where
    S: Sleeper + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} rate limited, retrying in {:?} (attempt {}/{})",
                    what,
                    delay,
                    attempt + 1,
                    policy.max_attempts
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriveError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_secs(1),
            inter_request_delay: Duration::ZERO,
        }
    }

    fn rate_limited() -> DriveError {
        DriveError::RemoteTransient {
            status: 429,
            message: "Rate Limit Exceeded".to_string(),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(5);
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let sleeper = RecordingSleeper::new();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = with_retry(&policy(5), &sleeper, "sheet", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(rate_limited())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::new();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = with_retry(&policy(3), &sleeper, "sheet", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(rate_limited())
        })
        .await;

        assert!(matches!(result, Err(DriveError::RemoteTransient { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let sleeper = RecordingSleeper::new();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = with_retry(&policy(5), &sleeper, "file", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DriveError::RemoteFatal {
                status: 404,
                message: "File not found".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(DriveError::RemoteFatal { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.calls().is_empty());
    }
}
