//! SQL schema for the SQLite key-value table.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per key. Collections are stored whole; a write always replaces
-- the entire value.
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value       BLOB NOT NULL,
    expires_at  INTEGER           -- Unix milliseconds UTC; NULL = no TTL
);

CREATE INDEX IF NOT EXISTS kv_expires_idx ON kv(expires_at)
    WHERE expires_at IS NOT NULL;

PRAGMA user_version = 1;
";
