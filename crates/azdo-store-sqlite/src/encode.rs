//! Conversions between Rust time values and the integer `expires_at` column.
//!
//! Expiry instants are stored as Unix milliseconds (UTC) so that expiry
//! checks are plain integer comparisons inside SQL.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Error, Result};

pub fn encode_millis(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn now_millis() -> i64 { encode_millis(Utc::now()) }

/// The `expires_at` value for an entry written now with `ttl`.
pub fn expiry_millis(ttl: Duration) -> Result<i64> {
  let delta = TimeDelta::from_std(ttl).map_err(|_| Error::TtlOutOfRange(ttl))?;
  Utc::now()
    .checked_add_signed(delta)
    .map(encode_millis)
    .ok_or(Error::TtlOutOfRange(ttl))
}
