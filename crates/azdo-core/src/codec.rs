//! JSON codec between collections and the bytes stored under one key.
//!
//! Zero-length bytes are the identity: they decode to the empty collection,
//! which is how a key that was never written is treated. Encoding is
//! deterministic because collections are built on ordered maps, so an
//! unchanged collection re-encodes to the same bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Decode stored bytes. Empty input yields `C::default()`.
pub fn decode<C>(bytes: &[u8]) -> Result<C>
where
  C: DeserializeOwned + Default,
{
  if bytes.is_empty() {
    return Ok(C::default());
  }
  serde_json::from_slice(bytes).map_err(|e| {
    tracing::warn!(error = %e, len = bytes.len(), "stored collection failed to decode");
    Error::Decode(e)
  })
}

pub fn encode<C: Serialize>(value: &C) -> Result<Vec<u8>> {
  serde_json::to_vec(value).map_err(Error::Encode)
}

/// Decode, apply `f`, and re-encode.
///
/// `f` reports whether it changed anything. When it did not, the input bytes
/// are returned as-is so the caller can skip the write.
pub fn modify<C, F>(bytes: &[u8], f: F) -> Result<Vec<u8>>
where
  C: Serialize + DeserializeOwned + Default,
  F: FnOnce(&mut C) -> bool,
{
  let mut value: C = decode(bytes)?;
  if !f(&mut value) {
    return Ok(bytes.to_vec());
  }
  encode(&value)
}
