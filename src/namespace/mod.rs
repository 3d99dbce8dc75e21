//! Namespace Module
//!
//! Maps a storage area's logical name onto a remote namespace.
//!
//! - **`resolver`**: find-or-create against the namespace listing.
//! - **`cache`**: the per-area slot holding the resolved namespace; concurrent
//!   first-use callers wait on the single in-flight resolution instead of racing
//!   duplicate creates.

pub mod cache;
pub mod resolver;

pub use cache::NamespaceCache;
pub use resolver::{Namespace, NamespaceResolver, Resolve};
