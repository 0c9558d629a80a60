//! Bounded retry with exponential backoff for transient store failures.
//!
//! Only errors that report `is_transient()` are retried; validation,
//! authentication, and permission failures surface immediately. Backoff
//! waits on the tokio timer so retrying commands never park a runtime
//! worker. Jitter is deterministic (derived from the attempt number and a
//! caller seed) so retry timing is reproducible in tests and logs.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::OrderError;

const BASE_DELAY_MS: u64 = 250;
const MAX_DELAY_MS: u64 = 5_000;

/// Attempt budget and backoff shape for `with_retry`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (attempt is 1-based; attempt 1 is the
    /// first retry). Doubles each attempt, clamped, plus deterministic jitter.
    pub fn delay_for(&self, attempt: u32, seed: i64) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);
        Duration::from_millis(backoff + deterministic_jitter_ms(seed, attempt))
    }
}

/// Jitter in 0..100ms derived from the seed and attempt. No RNG so the
/// schedule is stable for a given operation.
fn deterministic_jitter_ms(seed: i64, attempt: u32) -> u64 {
    let positive = seed.unsigned_abs();
    (positive.wrapping_mul(31).wrapping_add(u64::from(attempt) * 7)) % 100
}

/// Run `operation`, retrying transient failures per `policy`. The final
/// error is returned unchanged once the attempt budget is spent.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    seed: i64,
    mut operation: F,
) -> Result<T, OrderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrderError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                attempt += 1;
                let delay = policy.delay_for(attempt, seed);
                warn!(
                    operation = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
