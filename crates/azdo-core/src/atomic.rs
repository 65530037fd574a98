//! Optimistic read-transform-compare-and-swap over a single key.
//!
//! Each attempt reads the current bytes, runs the caller's transform on them
//! and writes the result back only if the key still holds what was read. A
//! lost race sleeps for a fixed backoff and starts over from a fresh read, so
//! the transform must be a pure function of its input: it is re-applied to
//! whatever the winning writer left behind.
//!
//! Transform errors and backend errors abort at once. Only a lost
//! compare-and-swap is retried, and only `max_attempts` times in total.

use std::time::Duration;

use crate::{Error, Result, kv::KvBackend};

/// Bounds for the retry loop. Backoff is fixed, not exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total number of compare-and-swap attempts, including the first.
  pub max_attempts: u32,
  /// Pause between a lost race and the next read.
  pub backoff:      Duration,
}

impl RetryPolicy {
  pub const DEFAULT_ATTEMPTS: u32 = 5;
  pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(50);
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: Self::DEFAULT_ATTEMPTS,
      backoff:      Self::DEFAULT_BACKOFF,
    }
  }
}

/// Apply `transform` to the value under `key` without losing concurrent
/// updates.
///
/// A missing key is presented to `transform` as empty bytes. If `transform`
/// returns exactly its input, nothing is written.
pub async fn atomic_modify<B, F>(
  backend: &B,
  key: &str,
  policy: &RetryPolicy,
  mut transform: F,
) -> Result<()>
where
  B: KvBackend,
  F: FnMut(&[u8]) -> Result<Vec<u8>>,
{
  let attempts = policy.max_attempts.max(1);

  for attempt in 1..=attempts {
    let current = backend.get(key).await.map_err(Error::backend)?;
    let base = current.as_deref().unwrap_or_default();

    let next = transform(base)?;
    if next == base {
      return Ok(());
    }

    let swapped = backend
      .compare_and_set(key, &next, current.as_deref())
      .await
      .map_err(Error::backend)?;
    if swapped {
      return Ok(());
    }

    tracing::debug!(key, attempt, "value changed concurrently; retrying");
    if attempt < attempts {
      tokio::time::sleep(policy.backoff).await;
    }
  }

  tracing::warn!(key, attempts, "giving up after repeated write conflicts");
  Err(Error::RetryLimitExceeded { key: key.to_owned(), attempts })
}
