//! A busy-timeout retry wrapper around a single libsql statement (§5:
//! "retry loop using a busy-timeout (5s)... readers never block writers").
//!
//! Grounded on the teacher's `execute_with_retry` (`memory-storage-turso/src/lib.rs`),
//! narrowed to retry only on lock contention rather than every error — a
//! syntax error or constraint violation should surface immediately, not
//! after five seconds of pointless backoff.

use memory_core::error::{Error, Result};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_millis(20);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Retry `op` while it fails with a lock-contention error, up to the
/// busy-timeout budget. Any other error returns immediately. Generic over
/// the underlying error type (anything `Display`) so this wrapper can sit
/// in front of any libsql call without depending on its error enum shape.
pub async fn with_busy_retry<T, E, F, Fut>(mut op: F) -> Result<T>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
{
    let deadline = Instant::now() + BUSY_TIMEOUT;
    let mut backoff = INITIAL_BACKOFF;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_lock_contention(&err) && Instant::now() < deadline => {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
            Err(err) => return Err(Error::Storage(err.to_string())),
        }
    }
}

fn is_lock_contention(err: &impl std::fmt::Display) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("database is locked") || message.contains("busy") || message.contains("locked")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_immediately_when_the_op_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_busy_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_contention_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_busy_retry(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>("syntax error".to_string()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lock_contention_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<i32> = with_busy_retry(|| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err("database is locked".to_string())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
