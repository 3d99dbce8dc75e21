//! Remote KV Storage Area Library
//!
//! Exposes a remote, namespaced key/value service through an interface shaped
//! like an asynchronous map: `set`, `get`, `delete`, `clear`, and ordered
//! iteration over `keys`, `values` and `entries`.
//!
//! ## Modules
//! - **`config`**: explicit API configuration and credential resolution.
//! - **`transport`**: the request-issuing seam (`Transport`) and the HTTP
//!   implementation backed by `reqwest`.
//! - **`namespace`**: lazy find-or-create of the namespace behind a storage
//!   area, memoized per area.
//! - **`storage`**: `StorageArea`, cursor-driven key listing and per-page value
//!   fan-out.
//! - **`error`**: the error taxonomy shared by every operation.

pub mod config;
pub mod error;
pub mod namespace;
pub mod storage;
pub mod transport;

pub use config::{ApiConfig, BulkMode, CredentialSource, Credentials};
pub use error::{Failure, Result, StorageError};
pub use storage::{Expiry, ListOptions, Payload, StorageArea, Value, ValueType, WriteEntry};

#[cfg(test)]
pub(crate) mod testing;
