//! SQLite backend for the Azure DevOps bridge store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. SQLite has no compare-and-swap
//! primitive; it is emulated with single-statement conditional writes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteKv;

#[cfg(test)]
mod tests;
