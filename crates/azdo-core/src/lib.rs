//! Storage core for the Azure DevOps chat bridge.
//!
//! Linked projects and event subscriptions are kept as whole collections under
//! a single backend key each. Writers never lock: every mutation goes through
//! [`atomic::atomic_modify`], an optimistic read-transform-compare-and-swap
//! loop over one key of a [`kv::KvBackend`].
//!
//! This crate is deliberately free of HTTP and database dependencies. Concrete
//! backends (e.g. `azdo-store-sqlite`) implement [`kv::KvBackend`].

pub mod atomic;
pub mod codec;
pub mod collection;
pub mod error;
pub mod kv;
pub mod memory;
pub mod oauth;
pub mod project;
pub mod store;
pub mod subscription;
pub mod user;

pub use error::{Error, Result};
pub use store::Store;
