//! Retry with exponential backoff for backend calls.

use std::future::Future;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::BackendResult;

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent. The last error is returned.
pub(crate) async fn with_retry<T, F, Fut>(
    operation: &str,
    retry: &RetryConfig,
    mut op: F,
) -> BackendResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let mut delay = retry.initial_delay();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(operation, attempts, "Succeeded after retries");
                }
                return Ok(value);
            }
            Err(e) => {
                if !e.is_transient() || attempts > retry.max_retries {
                    return Err(e);
                }

                warn!(
                    operation,
                    attempt = attempts,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Backend call failed, retrying"
                );

                sleep(delay).await;
                delay = retry.next_delay(delay);
            }
        }
    }
}
