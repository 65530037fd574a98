//! Azure DevOps identities of chat users, one record per key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, Store, codec,
  kv::KvBackend,
  store::{require_id, user_key},
};

/// A chat user's connected Azure DevOps account.
///
/// Tokens are stored as given; encrypting them is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
  pub chat_user_id:  String,
  pub azure_user_id: String,
  pub display_name:  String,
  pub access_token:  String,
  pub refresh_token: String,
  pub expires_at:    DateTime<Utc>,
}

impl UserRecord {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

impl<B: KvBackend> Store<B> {
  pub async fn store_user(&self, user: &UserRecord) -> Result<()> {
    require_id("chat user id", &user.chat_user_id)?;
    let bytes = codec::encode(user)?;
    self
      .backend()
      .set(&user_key(&user.chat_user_id), &bytes)
      .await
      .map_err(Error::backend)
  }

  /// Load a user's record. `None` if the user never connected.
  pub async fn load_user(&self, chat_user_id: &str) -> Result<Option<UserRecord>> {
    let Some(bytes) = self
      .backend()
      .get(&user_key(chat_user_id))
      .await
      .map_err(Error::backend)?
    else {
      return Ok(None);
    };
    // Empty bytes decode to `None`.
    codec::decode::<Option<UserRecord>>(&bytes)
  }

  pub async fn delete_user(&self, chat_user_id: &str) -> Result<()> {
    self
      .backend()
      .delete(&user_key(chat_user_id))
      .await
      .map_err(Error::backend)
  }
}
