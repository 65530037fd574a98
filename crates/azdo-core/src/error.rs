//! Error types for `azdo-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Stored bytes were non-empty but did not decode. Never treated as empty.
  #[error("malformed stored collection: {0}")]
  Decode(#[source] serde_json::Error),

  #[error("could not encode collection: {0}")]
  Encode(#[source] serde_json::Error),

  #[error("invalid entry: {0}")]
  InvalidEntry(String),

  #[error("gave up writing {key:?} after {attempts} conflicting attempts")]
  RetryLimitExceeded { key: String, attempts: u32 },

  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("oauth state is missing, expired or does not match")]
  InvalidOAuthState,

  #[error("unknown event type: {0:?}")]
  UnknownEventType(String),
}

impl Error {
  pub(crate) fn backend<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Backend(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
