//! Short-lived OAuth `state` values.
//!
//! Issued before redirecting a user to the Azure DevOps consent page and
//! checked when the callback arrives. Each value lives under a TTL key and is
//! consumed by the first verification, successful or not.

use rand_core::{OsRng, RngCore};

use crate::{
  Error, Result, Store,
  kv::KvBackend,
  store::{oauth_state_key, require_id},
};

const STATE_NONCE_BYTES: usize = 16;

impl<B: KvBackend> Store<B> {
  /// Issue and persist a fresh state value for `chat_user_id`.
  ///
  /// The value is `<hex nonce>_<chat user id>`. Issuing again replaces any
  /// outstanding value.
  pub async fn store_oauth_state(&self, chat_user_id: &str) -> Result<String> {
    require_id("chat user id", chat_user_id)?;
    let mut nonce = [0u8; STATE_NONCE_BYTES];
    OsRng.fill_bytes(&mut nonce);
    let state = format!("{}_{chat_user_id}", hex::encode(nonce));

    self
      .backend()
      .set_with_ttl(&oauth_state_key(chat_user_id), state.as_bytes(), self.oauth_state_ttl())
      .await
      .map_err(Error::backend)?;
    Ok(state)
  }

  /// Check `state` against the outstanding value for `chat_user_id`.
  ///
  /// The stored value is blanked with a compare-and-set before it is
  /// compared, so when several callbacks race only the one whose claim lands
  /// can succeed. An empty stored value counts as absent.
  pub async fn verify_oauth_state(&self, chat_user_id: &str, state: &str) -> Result<()> {
    let key = oauth_state_key(chat_user_id);
    let stored = self
      .backend()
      .get(&key)
      .await
      .map_err(Error::backend)?
      .filter(|stored| !stored.is_empty());

    let claimed = match stored.as_deref() {
      Some(current) => self
        .backend()
        .compare_and_set(&key, b"", Some(current))
        .await
        .map_err(Error::backend)?,
      None => false,
    };
    if claimed {
      self.backend().delete(&key).await.map_err(Error::backend)?;
    }

    match stored {
      Some(stored) if claimed && stored == state.as_bytes() => Ok(()),
      _ => {
        tracing::warn!(user = chat_user_id, claimed, "rejected oauth state");
        Err(Error::InvalidOAuthState)
      }
    }
  }
}
