/*!
Retry transient failures with jittered exponential backoff
*/
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;

/// Run `operation` up to `max_attempts` times, retrying only errors for which [`Error::is_retryable`] holds
pub async fn retry_with_backoff<F, Fut, T>(operation: F, max_attempts: usize) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let strategy = ExponentialBackoff::from_millis(10)
        .factor(10)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(max_attempts.saturating_sub(1));
    RetryIf::spawn(strategy, operation, |err: &Error| {
        let retryable = err.is_retryable();
        if retryable {
            tracing::warn!(error = %err, "retrying transient failure");
        }
        retryable
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unavailable() -> Error {
        Error::Status {
            status: 503,
            url: "https://example.com".into(),
        }
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = retry_with_backoff(
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(7)
                }
            },
            3,
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            },
            2,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_errors_fail_fast() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::parse("bad payload"))
            },
            5,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
