//! The `KvBackend` trait: the only persistence primitive the core relies on.
//!
//! The host runtime offers a shared byte store with single-key
//! compare-and-swap and nothing more: no transactions, no multi-key
//! atomicity. Everything in this crate is built on those five operations.

use std::{future::Future, time::Duration};

/// Abstraction over a shared key-value store.
///
/// Keys that carry a TTL read as absent once expired, for every operation
/// including [`compare_and_set`](KvBackend::compare_and_set).
///
/// All methods return `Send` futures so backends can be shared across tasks
/// of a multi-threaded runtime.
pub trait KvBackend: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`. `None` if absent or expired.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  /// Unconditionally store `value` under `key`, clearing any TTL.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: &'a [u8],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Unconditionally store `value` under `key`; it expires after `ttl`.
  fn set_with_ttl<'a>(
    &'a self,
    key: &'a str,
    value: &'a [u8],
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Store `new` under `key` only if the current value equals `expected`.
  ///
  /// `expected == None` means the key must currently be absent. Returns
  /// `Ok(false)` when the stored value no longer matches; that is a lost
  /// race, not an error.
  fn compare_and_set<'a>(
    &'a self,
    key: &'a str,
    new: &'a [u8],
    expected: Option<&'a [u8]>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key succeeds.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
