use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::ScrapeError;

/// Polls `probe` until it yields a value or `timeout` elapses.
///
/// The probe returns `Ok(Some(value))` when the condition holds,
/// `Ok(None)` to keep waiting, and `Err` to abort immediately.
/// Timing out is a structural failure naming `what`, so callers get
/// an error like "timed out after 20s waiting for password field".
pub async fn wait_for_condition<T, F, Fut>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ScrapeError>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            debug!(what, attempts, "condition met");
            return Ok(value);
        }
        if Instant::now() + poll_interval > deadline {
            return Err(ScrapeError::structural(format!(
                "timed out after {}s waiting for {what}",
                timeout.as_secs()
            )));
        }
        trace!(what, attempts, "condition not met yet");
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_wait_succeeds_after_retries() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let value = wait_for_condition(
            "counter to reach 3",
            Duration::from_secs(5),
            Duration::from_millis(1),
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n >= 3 { Some(n) } else { None })
            },
        )
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_wait_times_out_with_structural_error() {
        let err = wait_for_condition::<(), _, _>(
            "login form",
            Duration::from_millis(10),
            Duration::from_millis(2),
            || async { Ok(None) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "structural");
        assert!(err.to_string().contains("login form"));
    }

    #[tokio::test]
    async fn test_wait_propagates_probe_error() {
        let err = wait_for_condition::<(), _, _>(
            "anything",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async { Err(ScrapeError::infra("page gone")) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "infra");
    }
}
