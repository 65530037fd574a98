//! [`MemoryKv`] — a process-local [`KvBackend`].
//!
//! Useful for tests and for embedding the store where no shared backend
//! exists. Expiry uses the tokio clock, so a paused test runtime controls it.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use thiserror::Error;
use tokio::time::Instant;

use crate::kv::KvBackend;

#[derive(Debug, Error)]
pub enum MemoryKvError {
  #[error("memory store lock poisoned")]
  Poisoned,
}

#[derive(Debug)]
struct Slot {
  value:      Vec<u8>,
  expires_at: Option<Instant>,
}

impl Slot {
  fn live(&self, now: Instant) -> bool {
    self.expires_at.is_none_or(|at| at > now)
  }
}

/// Mutex-guarded map of keys to byte values.
#[derive(Debug, Default)]
pub struct MemoryKv {
  slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryKv {
  pub fn new() -> Self { Self::default() }

  fn with_slots<R>(
    &self,
    f: impl FnOnce(&mut HashMap<String, Slot>, Instant) -> R,
  ) -> Result<R, MemoryKvError> {
    let mut slots = self.slots.lock().map_err(|_| MemoryKvError::Poisoned)?;
    let now = Instant::now();
    slots.retain(|_, slot| slot.live(now));
    Ok(f(&mut slots, now))
  }

  fn put(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), MemoryKvError> {
    self.with_slots(|slots, now| {
      slots.insert(key.to_owned(), Slot {
        value:      value.to_vec(),
        expires_at: ttl.map(|ttl| now + ttl),
      });
    })
  }
}

impl KvBackend for MemoryKv {
  type Error = MemoryKvError;

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, MemoryKvError> {
    self.with_slots(|slots, _| slots.get(key).map(|slot| slot.value.clone()))
  }

  async fn set(&self, key: &str, value: &[u8]) -> Result<(), MemoryKvError> {
    self.put(key, value, None)
  }

  async fn set_with_ttl(
    &self,
    key: &str,
    value: &[u8],
    ttl: Duration,
  ) -> Result<(), MemoryKvError> {
    self.put(key, value, Some(ttl))
  }

  async fn compare_and_set(
    &self,
    key: &str,
    new: &[u8],
    expected: Option<&[u8]>,
  ) -> Result<bool, MemoryKvError> {
    self.with_slots(|slots, _| {
      let current = slots.get(key).map(|slot| slot.value.as_slice());
      if current != expected {
        return false;
      }
      slots.insert(key.to_owned(), Slot { value: new.to_vec(), expires_at: None });
      true
    })
  }

  async fn delete(&self, key: &str) -> Result<(), MemoryKvError> {
    self.with_slots(|slots, _| {
      slots.remove(key);
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn missing_key_reads_as_none() {
    let kv = MemoryKv::new();
    assert_eq!(kv.get("nope").await.unwrap(), None);
    kv.delete("nope").await.unwrap();
  }

  #[tokio::test]
  async fn compare_and_set_on_absent_key() {
    let kv = MemoryKv::new();
    assert!(kv.compare_and_set("k", b"one", None).await.unwrap());
    // Second absent-expectation loses: the key now exists.
    assert!(!kv.compare_and_set("k", b"two", None).await.unwrap());
    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some(&b"one"[..]));
  }

  #[tokio::test]
  async fn compare_and_set_requires_matching_value() {
    let kv = MemoryKv::new();
    kv.set("k", b"one").await.unwrap();

    assert!(!kv.compare_and_set("k", b"two", Some(b"stale")).await.unwrap());
    assert!(kv.compare_and_set("k", b"two", Some(b"one")).await.unwrap());
    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some(&b"two"[..]));
  }

  #[tokio::test(start_paused = true)]
  async fn ttl_entries_expire() {
    let kv = MemoryKv::new();
    kv.set_with_ttl("k", b"v", Duration::from_secs(60)).await.unwrap();
    assert!(kv.get("k").await.unwrap().is_some());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(kv.get("k").await.unwrap(), None);
    // An expired key counts as absent for compare-and-set too.
    assert!(kv.compare_and_set("k", b"w", None).await.unwrap());
  }

  #[tokio::test(start_paused = true)]
  async fn plain_set_clears_ttl() {
    let kv = MemoryKv::new();
    kv.set_with_ttl("k", b"v", Duration::from_secs(1)).await.unwrap();
    kv.set("k", b"w").await.unwrap();

    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(kv.get("k").await.unwrap().as_deref(), Some(&b"w"[..]));
  }
}
