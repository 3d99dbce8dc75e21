//! Storage Module
//!
//! A map-like asynchronous interface over one remote namespace.
//!
//! ## Core Concepts
//! - **Lazy binding**: `StorageArea` resolves its namespace on first use and caches it.
//! - **Pagination**: `KeyLister` follows listing cursors one page per pull.
//! - **Fan-out**: values of one page are fetched concurrently and re-zipped in key order.
//! - **Bulk writes**: multi-entry writes use the `/bulk` endpoints or concurrent
//!   single-entry calls, depending on [`BulkMode`](crate::config::BulkMode).

pub mod area;
pub mod fetcher;
pub mod iter;
pub mod lister;
pub mod types;

pub use area::StorageArea;
pub use iter::{Entries, Keys, Values};
pub use lister::KeyLister;
pub use types::*;
