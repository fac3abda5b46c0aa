// bookstore/src/store/retry.rs
use super::StoreResult;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded retry with exponential backoff for store calls.
///
/// Only transient errors (`StoreError::is_transient`) are retried; everything else is
/// returned on the first occurrence. The operation must be safe to replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  base_delay: Duration,
}

const MAX_DELAY: Duration = Duration::from_secs(5);

impl RetryPolicy {
  /// `max_attempts` counts the first try; values below 1 are raised to 1.
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      base_delay,
    }
  }

  pub fn no_retry() -> Self {
    Self::new(1, Duration::ZERO)
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`, capped.
  pub fn delay_for(&self, retry: u32) -> Duration {
    let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(MAX_DELAY)
  }

  /// Runs `op` until it succeeds, fails permanently or runs out of attempts.
  /// `op` receives the 1-based attempt number.
  pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> StoreResult<T>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
  {
    let mut attempt = 1;
    loop {
      match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(err) if err.is_transient() && attempt < self.max_attempts => {
          let delay = self.delay_for(attempt);
          warn!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %err, "Transient store failure, retrying.");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(err) => return Err(err),
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(3, Duration::from_millis(50))
  }
}
