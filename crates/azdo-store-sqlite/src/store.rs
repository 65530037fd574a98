//! [`SqliteKv`] — the SQLite implementation of [`KvBackend`].

use std::{path::Path, time::Duration};

use azdo_core::kv::KvBackend;
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{expiry_millis, now_millis},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A key-value store backed by a single SQLite file.
///
/// Several processes may open the same file; every compare-and-set is one
/// SQL statement and therefore atomic.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteKv {
  conn: tokio_rusqlite::Connection,
}

impl SqliteKv {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delete every expired row. Expired rows are already invisible to reads;
  /// this only reclaims space. Returns the number of rows removed.
  pub async fn purge_expired(&self) -> Result<usize> {
    let now = now_millis();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM kv WHERE expires_at IS NOT NULL AND expires_at <= ?1",
          rusqlite::params![now],
        )?)
      })
      .await?;
    tracing::debug!(removed, "purged expired keys");
    Ok(removed)
  }

  async fn upsert(&self, key: &str, value: &[u8], expires_at: Option<i64>) -> Result<()> {
    let key   = key.to_owned();
    let value = value.to_vec();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, expires_at = excluded.expires_at",
          rusqlite::params![key, value, expires_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── KvBackend impl ──────────────────────────────────────────────────────────

impl KvBackend for SqliteKv {
  type Error = crate::Error;

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let key = key.to_owned();
    let now = now_millis();

    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM kv
               WHERE key = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
              rusqlite::params![key, now],
              |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    self.upsert(key, value, None).await
  }

  async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
    let expires_at = expiry_millis(ttl)?;
    self.upsert(key, value, Some(expires_at)).await
  }

  async fn compare_and_set(
    &self,
    key: &str,
    new: &[u8],
    expected: Option<&[u8]>,
  ) -> Result<bool> {
    let key      = key.to_owned();
    let new      = new.to_vec();
    let expected = expected.map(<[u8]>::to_vec);
    let now      = now_millis();

    let changed = self
      .conn
      .call(move |conn| {
        let changed = match expected {
          // Insert only if the key is absent or has expired.
          None => conn.execute(
            "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, NULL)
             ON CONFLICT(key) DO UPDATE
               SET value = excluded.value, expires_at = NULL
               WHERE kv.expires_at IS NOT NULL AND kv.expires_at <= ?3",
            rusqlite::params![key, new, now],
          )?,
          Some(old) => conn.execute(
            "UPDATE kv SET value = ?2, expires_at = NULL
             WHERE key = ?1 AND value = ?3
               AND (expires_at IS NULL OR expires_at > ?4)",
            rusqlite::params![key, new, old, now],
          )?,
        };
        Ok(changed)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM kv WHERE key = ?1", rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
