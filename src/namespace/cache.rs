use super::resolver::{Namespace, NamespaceResolver, Resolve};
use crate::error::{Result, StorageError};

use std::future::Future;
use tokio::sync::Mutex;

/// Memoized namespace resolution for one storage area.
///
/// The slot lock is held for the whole resolution, so callers arriving while a
/// resolution is in flight wait for it and reuse its result. A failed resolution
/// leaves the slot empty and the next caller tries again.
pub struct NamespaceCache {
    title: String,
    resolver: NamespaceResolver,
    slot: Mutex<Option<Namespace>>,
}

impl NamespaceCache {
    pub fn new(title: &str, resolver: NamespaceResolver) -> Self {
        Self {
            title: title.to_string(),
            resolver,
            slot: Mutex::new(None),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The cached namespace, without resolving.
    pub async fn peek(&self) -> Option<Namespace> {
        self.slot.lock().await.clone()
    }

    /// Returns the cached namespace, resolving (and creating) it on first use.
    pub async fn get_or_resolve(&self) -> Result<Namespace> {
        let mut slot = self.slot.lock().await;
        if let Some(namespace) = slot.as_ref() {
            return Ok(namespace.clone());
        }

        let namespace = self
            .resolver
            .resolve(&self.title, Resolve::CreateIfMissing)
            .await?
            .ok_or_else(|| StorageError::NamespaceCreation {
                title: self.title.clone(),
                failure: crate::error::Failure::Decode("resolver returned no namespace".to_string()),
            })?;

        *slot = Some(namespace.clone());
        Ok(namespace)
    }

    /// Runs `delete` against the existing namespace, if any, and empties the slot
    /// once it succeeds. Never creates a namespace.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn clear_with<F, Fut>(&self, delete: F) -> Result<bool>
    where
        F: FnOnce(Namespace) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut slot = self.slot.lock().await;
        let namespace = match slot.clone() {
            Some(namespace) => namespace,
            None => match self.resolver.resolve(&self.title, Resolve::ExistingOnly).await? {
                Some(namespace) => namespace,
                None => return Ok(false),
            },
        };

        delete(namespace).await?;
        *slot = None;
        Ok(true)
    }
}
