//! Error type for `azdo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("ttl of {0:?} is out of range")]
  TtlOutOfRange(std::time::Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
