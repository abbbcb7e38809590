//! Opt-in retry with exponential backoff. Nothing in the data path retries
//! on its own.

use std::{future::Future, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Attempts after the first.
  pub max_retries: u32,
  pub delay:       Duration,
  /// Double the delay after every failed attempt.
  pub backoff:     bool,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { max_retries: 3, delay: Duration::from_millis(500), backoff: true }
  }
}

impl RetryPolicy {
  /// Delay before retry number `attempt + 1`.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    if self.backoff {
      self.delay.saturating_mul(2u32.saturating_pow(attempt))
    } else {
      self.delay
    }
  }
}

/// Run `op` until it succeeds, `should_retry` rejects its error, or the
/// policy's retries are used up. Returns the last error.
pub async fn with_retry<T, E, F, Fut>(
  policy: RetryPolicy,
  should_retry: impl Fn(&E) -> bool,
  mut op: F,
) -> Result<T, E>
where
  E: std::fmt::Display,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let mut attempt = 0;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) if attempt >= policy.max_retries || !should_retry(&err) => return Err(err),
      Err(err) => {
        let delay = policy.delay_for(attempt);
        attempt += 1;
        tracing::warn!(%err, attempt, ?delay, "operation failed, retrying");
        tokio::time::sleep(delay).await;
      }
    }
  }
}
