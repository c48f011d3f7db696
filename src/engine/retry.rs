//! Retry controller — bounded retry with linear backoff.
//!
//! Wraps a zero-argument operation and reruns it while failures classify as
//! transient, sleeping `base_delay * attempt_number` between attempts.
//! Permanent failures return immediately after a single attempt. The
//! controller performs no deduplication; the call site must only hand it
//! operations that are safe to repeat.

use crate::types::{Result, RetryConfig};
use futures::future::BoxFuture;
use serde_json::Value;

/// Final result of a retried operation with the attempt count attached.
#[derive(Debug)]
pub struct RetryOutcome {
    pub result: Result<Value>,
    pub attempts: u32,
}

/// Retry-around-call wrapper.
#[derive(Debug, Clone)]
pub struct RetryController {
    config: RetryConfig,
}

impl RetryController {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `attempt_fn` up to `max_attempts` times. Each call produces one
    /// fresh attempt future.
    pub async fn execute<'a, F>(&self, mut attempt_fn: F) -> RetryOutcome
    where
        F: FnMut() -> BoxFuture<'a, Result<Value>> + Send,
    {
        let budget = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match attempt_fn().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    }
                }
                Err(e) if e.is_transient() && attempt < budget => {
                    let delay = self.config.base_delay * attempt;
                    tracing::debug!(
                        attempt,
                        budget,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return RetryOutcome {
                        result: Err(e),
                        attempts: attempt,
                    }
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
