//! [`Store`] — the repository facade over a [`KvBackend`].
//!
//! Repository operations are spread over the domain modules
//! ([`project`](crate::project), [`subscription`](crate::subscription),
//! [`user`](crate::user), [`oauth`](crate::oauth)) as `impl` blocks on this
//! type. None of them keep state between calls; each is a self-contained
//! read-modify-write.

use std::{sync::Arc, time::Duration};

use crate::{
  Error, Result,
  atomic::{RetryPolicy, atomic_modify},
  codec,
  collection::{Collection, Entry},
  kv::KvBackend,
};

// ─── Backend keys ────────────────────────────────────────────────────────────

/// Every linked project of every user lives under this one key.
pub const PROJECT_LIST_KEY: &str = "project_list";

/// Every subscription of every user lives under this one key.
pub const SUBSCRIPTION_LIST_KEY: &str = "subscription_list";

const USER_KEY_PREFIX: &str = "user_";
const OAUTH_STATE_KEY_PREFIX: &str = "oauth_state_";

pub fn user_key(chat_user_id: &str) -> String { format!("{USER_KEY_PREFIX}{chat_user_id}") }

pub fn oauth_state_key(chat_user_id: &str) -> String {
  format!("{OAUTH_STATE_KEY_PREFIX}{chat_user_id}")
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Repository facade. Cloning is cheap — the backend is reference-counted.
#[derive(Debug)]
pub struct Store<B> {
  backend:         Arc<B>,
  retry:           RetryPolicy,
  oauth_state_ttl: Duration,
}

impl<B> Clone for Store<B> {
  fn clone(&self) -> Self {
    Self {
      backend:         Arc::clone(&self.backend),
      retry:           self.retry,
      oauth_state_ttl: self.oauth_state_ttl,
    }
  }
}

impl<B: KvBackend> Store<B> {
  pub const DEFAULT_OAUTH_STATE_TTL: Duration = Duration::from_secs(300);

  pub fn new(backend: B) -> Self { Self::from_arc(Arc::new(backend)) }

  pub fn from_arc(backend: Arc<B>) -> Self {
    Self {
      backend,
      retry: RetryPolicy::default(),
      oauth_state_ttl: Self::DEFAULT_OAUTH_STATE_TTL,
    }
  }

  pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_oauth_state_ttl(mut self, ttl: Duration) -> Self {
    self.oauth_state_ttl = ttl;
    self
  }

  pub fn backend(&self) -> &B { &self.backend }

  pub fn retry_policy(&self) -> RetryPolicy { self.retry }

  pub(crate) fn oauth_state_ttl(&self) -> Duration { self.oauth_state_ttl }

  /// Load and decode the collection stored under `key`.
  pub(crate) async fn load_collection<T: Entry>(&self, key: &str) -> Result<Collection<T>> {
    let bytes = self.backend.get(key).await.map_err(Error::backend)?;
    codec::decode(bytes.as_deref().unwrap_or_default())
  }

  /// Atomically apply `mutate` to the collection under `key`.
  ///
  /// `mutate` may run more than once and must only look at the collection it
  /// is handed. It reports whether it changed anything.
  pub(crate) async fn modify_collection<T, F>(&self, key: &str, mut mutate: F) -> Result<()>
  where
    T: Entry,
    F: FnMut(&mut Collection<T>) -> bool,
  {
    atomic_modify(&*self.backend, key, &self.retry, |bytes| {
      codec::modify::<Collection<T>, _>(bytes, &mut mutate)
    })
    .await
  }
}

/// Reject an empty identifier; `field` names it in the error.
pub(crate) fn require_id(field: &str, value: &str) -> Result<()> {
  if value.is_empty() {
    return Err(Error::InvalidEntry(format!("{field} must not be empty")));
  }
  Ok(())
}
