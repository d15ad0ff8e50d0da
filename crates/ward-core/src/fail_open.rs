//! Fail-open utilities for instrumentation
//!
//! Reporting, metrics, screenshots-on-teardown and summary generation must never be
//! the reason a correctness test fails. Wrap those operations here: the error is
//! logged via `tracing::warn!` and the caller receives `None`.
//!
//! DO NOT use fail-open for:
//! - Authentication (a broken session must fail the test)
//! - Fixture lookups (a missing role/name/email must fail the test)
//! - Screenshot capture requested by the test body

use std::future::Future;
use tracing::{debug, warn};

use crate::Result;

/// Execute an async instrumentation operation, logging and discarding failures
///
/// # Usage
///
/// ```no_run
/// use ward_core::fail_open::fail_open;
/// use ward_core::Result;
///
/// async fn write_summary() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let written = fail_open("summary", || write_summary()).await;
///     // written is None if write_summary() failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            report(operation_name, &e);
            None
        }
    }
}

/// Synchronous variant of [`fail_open`] for file-system instrumentation
pub fn fail_open_sync<F, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    match f() {
        Ok(val) => Some(val),
        Err(e) => {
            report(operation_name, &e);
            None
        }
    }
}

/// Like fail_open but with linear backoff retries
///
/// Retries the operation up to `max_retries` times. The backoff duration is
/// `100ms * attempt`.
pub async fn fail_open_with_retries<F, Fut, T>(
    operation_name: &str,
    mut f: F,
    max_retries: usize,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=max_retries {
        match f().await {
            Ok(val) => return Some(val),
            Err(e) => {
                if attempt == max_retries {
                    warn!(
                        "{} failed after {} retries (fail-open): {}",
                        operation_name, max_retries, e
                    );
                    return None;
                }
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation_name, attempt, max_retries, e
                );
                let delay_ms = 100 * attempt as u64;
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
        }
    }
    None
}

// Closed pages are expected at teardown; keep them out of the warning stream.
fn report(operation_name: &str, e: &crate::WardError) {
    if e.is_page_closed() {
        debug!("{} skipped, page already closed: {}", operation_name, e);
    } else {
        warn!("⚠️ {} failed (fail-open): {}", operation_name, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WardError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, WardError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(WardError::Report("disk full".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[test]
    fn test_fail_open_sync_page_closed() {
        let result = fail_open_sync("metrics", || Err::<(), _>(WardError::PageClosed));
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fail_open_with_retries_success_after_retry() {
        let mut attempts = 0;
        let result = fail_open_with_retries(
            "test_op",
            || {
                attempts += 1;
                async move {
                    if attempts < 2 {
                        Err(WardError::Other("transient error".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            },
            3,
        )
        .await;
        assert_eq!(result, Some(42));
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_fail_open_with_retries_all_failures() {
        let mut attempts = 0;
        let result = fail_open_with_retries(
            "test_op",
            || {
                attempts += 1;
                async move { Err::<i32, _>(WardError::Other("persistent error".to_string())) }
            },
            3,
        )
        .await;
        assert_eq!(result, None);
        assert_eq!(attempts, 3);
    }
}
