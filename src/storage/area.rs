//! Storage Area
//!
//! The public face of the crate: a map-like, asynchronous view over one remote
//! namespace. The namespace is resolved lazily on the first operation and
//! cached until a successful [`StorageArea::clear`].

use super::fetcher::{is_not_found, read_value};
use super::iter::{Entries, Keys, Values};
use super::lister::KeyLister;
use super::types::*;
use crate::config::{ApiConfig, BulkMode, CredentialSource};
use crate::error::{Failure, Result, StorageError, WriteFailure};
use crate::namespace::{Namespace, NamespaceCache, NamespaceResolver};
use crate::transport::protocol::{bulk_endpoint, namespace_endpoint, value_endpoint};
use crate::transport::{ApiRequest, HttpTransport, Transport};

use futures::future::join_all;
use std::sync::Arc;

pub struct StorageArea {
    transport: Arc<dyn Transport>,
    namespace: NamespaceCache,
    bulk_mode: BulkMode,
}

impl StorageArea {
    /// Binds `name` to a namespace of the account described by `config`.
    pub fn new(name: &str, config: ApiConfig) -> Self {
        let bulk_mode = config.bulk_mode;
        Self::with_transport(name, Arc::new(HttpTransport::new(config)), bulk_mode)
    }

    /// Like [`new`](Self::new), resolving credentials from `source` first.
    pub fn from_source(name: &str, source: &CredentialSource) -> Result<Self> {
        Ok(Self::new(name, ApiConfig::discover(source)?))
    }

    pub fn with_transport(name: &str, transport: Arc<dyn Transport>, bulk_mode: BulkMode) -> Self {
        let resolver = NamespaceResolver::new(transport.clone());
        Self {
            namespace: NamespaceCache::new(name, resolver),
            transport,
            bulk_mode,
        }
    }

    pub fn name(&self) -> &str {
        self.namespace.title()
    }

    /// The namespace this area is currently bound to, if it has been resolved.
    pub async fn namespace(&self) -> Option<Namespace> {
        self.namespace.peek().await
    }

    async fn namespace_id(&self) -> Result<String> {
        Ok(self.namespace.get_or_resolve().await?.id)
    }

    // --- Writes ---

    /// Stores `value` under `key`. `None` deletes the key.
    pub async fn set(&self, key: &str, value: Option<Payload>, expiry: Option<Expiry>) -> Result<()> {
        let Some(value) = value else {
            return self.delete(key).await;
        };
        let namespace_id = self.namespace_id().await?;
        put_one(self.transport.as_ref(), &namespace_id, key, &value, expiry)
            .await
            .map_err(|failure| single_write_error(key, failure))
    }

    /// Writes several entries. Entries without a value are deleted.
    ///
    /// `default_expiry` applies to entries that carry none of their own. Every
    /// failure is reported; writes that did reach the server are not undone.
    pub async fn set_many(&self, entries: Vec<WriteEntry>, default_expiry: Option<Expiry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let namespace_id = self.namespace_id().await?;

        let (writes, deletes): (Vec<WriteEntry>, Vec<WriteEntry>) =
            entries.into_iter().partition(|entry| entry.value.is_some());
        let delete_keys: Vec<String> = deletes.into_iter().map(|entry| entry.key).collect();

        let failures: Vec<WriteFailure> = match self.bulk_mode {
            BulkMode::Batched => {
                let (write_failures, delete_failures) = futures::join!(
                    self.bulk_put(&namespace_id, &writes, default_expiry),
                    self.bulk_delete(&namespace_id, &delete_keys)
                );
                write_failures.into_iter().chain(delete_failures).collect()
            }
            BulkMode::PerEntry => {
                let transport = self.transport.as_ref();
                let namespace_id = namespace_id.as_str();
                let puts = writes
                    .iter()
                    .filter_map(|entry| Some((&entry.key, entry.value.as_ref()?, entry.expiry)))
                    .map(|(key, value, expiry)| async move {
                        put_one(transport, namespace_id, key, value, expiry.or(default_expiry))
                            .await
                            .err()
                            .map(|failure| WriteFailure {
                                key: Some(key.clone()),
                                failure,
                            })
                    });
                let (put_failures, delete_failures) =
                    futures::join!(join_all(puts), self.delete_each(namespace_id, &delete_keys));
                put_failures
                    .into_iter()
                    .flatten()
                    .chain(delete_failures)
                    .collect()
            }
        };

        into_write_result(failures)
    }

    /// Removes `key`. Succeeds whether or not the key existed.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let namespace_id = self.namespace_id().await?;
        delete_one(self.transport.as_ref(), &namespace_id, key)
            .await
            .map_err(|failure| single_write_error(key, failure))
    }

    /// Removes several keys.
    pub async fn delete_many(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let namespace_id = self.namespace_id().await?;
        let failures = match self.bulk_mode {
            BulkMode::Batched => self.bulk_delete(&namespace_id, keys).await,
            BulkMode::PerEntry => self.delete_each(&namespace_id, keys).await,
        };
        into_write_result(failures)
    }

    /// Deletes the whole namespace. A namespace that was never created is left
    /// alone; nothing is created just to be deleted.
    pub async fn clear(&self) -> Result<()> {
        let transport = self.transport.clone();
        let cleared = self
            .namespace
            .clear_with(|namespace| async move {
                let response = transport
                    .send(ApiRequest::delete(namespace_endpoint(&namespace.id)))
                    .await
                    .map_err(|e| StorageError::Clear(e.into()))?;
                response.into_ack().map_err(StorageError::Clear)
            })
            .await?;

        if cleared {
            tracing::info!("Cleared storage area '{}'", self.name());
        } else {
            tracing::debug!("Storage area '{}' has no namespace, nothing to clear", self.name());
        }
        Ok(())
    }

    // --- Reads ---

    /// Returns the value stored at `key`, or `None` when there is none.
    pub async fn get(&self, key: &str, value_type: ValueType) -> Result<Option<Value>> {
        let namespace_id = self.namespace_id().await?;
        read_value(self.transport.as_ref(), &namespace_id, key, value_type)
            .await
            .map_err(|failure| {
                tracing::error!("GET '{}' failed: {}", key, failure);
                StorageError::Read {
                    key: key.to_string(),
                    failure,
                }
            })
    }

    /// All keys in ascending order, one listing page per batch.
    pub async fn keys(&self, options: ListOptions) -> Result<Keys> {
        let namespace_id = self.namespace_id().await?;
        Ok(Keys::new(KeyLister::new(
            self.transport.clone(),
            &namespace_id,
            options.limit,
        )))
    }

    /// All values, ordered like [`keys`](Self::keys).
    pub async fn values(&self, options: ListOptions) -> Result<Values> {
        Ok(Values::new(self.entries(options).await?))
    }

    /// All `(key, value)` pairs, ordered like [`keys`](Self::keys).
    pub async fn entries(&self, options: ListOptions) -> Result<Entries> {
        let namespace_id = self.namespace_id().await?;
        let lister = KeyLister::new(self.transport.clone(), &namespace_id, options.limit);
        Ok(Entries::new(
            lister,
            self.transport.clone(),
            &namespace_id,
            options.value_type,
        ))
    }

    // --- Bulk helpers ---

    async fn bulk_put(
        &self,
        namespace_id: &str,
        entries: &[WriteEntry],
        default_expiry: Option<Expiry>,
    ) -> Vec<WriteFailure> {
        let items: Vec<_> = entries
            .iter()
            .filter_map(|entry| {
                let value = entry.value.as_ref()?;
                Some(value.to_bulk_item(&entry.key, entry.expiry.or(default_expiry)))
            })
            .collect();
        if items.is_empty() {
            return Vec::new();
        }

        let body = match serde_json::to_value(&items) {
            Ok(body) => body,
            Err(e) => return vec![bulk_failure(Failure::Decode(e.to_string()))],
        };
        tracing::debug!("Bulk writing {} entries", items.len());
        self.send_bulk(ApiRequest::put(bulk_endpoint(namespace_id)).with_json(body))
            .await
    }

    async fn bulk_delete(&self, namespace_id: &str, keys: &[String]) -> Vec<WriteFailure> {
        if keys.is_empty() {
            return Vec::new();
        }
        tracing::debug!("Bulk deleting {} keys", keys.len());
        let body = serde_json::Value::from(keys.to_vec());
        self.send_bulk(ApiRequest::delete(bulk_endpoint(namespace_id)).with_json(body))
            .await
    }

    async fn send_bulk(&self, request: ApiRequest) -> Vec<WriteFailure> {
        let outcome = match self.transport.send(request).await {
            Ok(response) => response.into_ack(),
            Err(e) => Err(e.into()),
        };
        outcome.err().map(bulk_failure).into_iter().collect()
    }

    async fn delete_each(&self, namespace_id: &str, keys: &[String]) -> Vec<WriteFailure> {
        let transport = self.transport.as_ref();
        let deletes = keys.iter().map(|key| async move {
            delete_one(transport, namespace_id, key)
                .await
                .err()
                .map(|failure| WriteFailure {
                    key: Some(key.clone()),
                    failure,
                })
        });
        join_all(deletes).await.into_iter().flatten().collect()
    }
}

async fn put_one(
    transport: &dyn Transport,
    namespace_id: &str,
    key: &str,
    value: &Payload,
    expiry: Option<Expiry>,
) -> std::result::Result<(), Failure> {
    let mut request = ApiRequest::put(value_endpoint(namespace_id, key)).with_bytes(value.to_bytes());
    if let Some(expiry) = expiry {
        let (name, seconds) = expiry.query_param();
        request = request.with_query(name, seconds);
    }
    transport.send(request).await?.into_ack()
}

async fn delete_one(
    transport: &dyn Transport,
    namespace_id: &str,
    key: &str,
) -> std::result::Result<(), Failure> {
    let response = transport
        .send(ApiRequest::delete(value_endpoint(namespace_id, key)))
        .await?;
    match response.into_ack() {
        Err(failure) if is_not_found(&failure) => Ok(()),
        outcome => outcome,
    }
}

fn single_write_error(key: &str, failure: Failure) -> StorageError {
    tracing::error!("Write to '{}' failed: {}", key, failure);
    StorageError::Write(vec![WriteFailure {
        key: Some(key.to_string()),
        failure,
    }])
}

fn bulk_failure(failure: Failure) -> WriteFailure {
    WriteFailure { key: None, failure }
}

fn into_write_result(failures: Vec<WriteFailure>) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    tracing::error!("{} write(s) failed", failures.len());
    Err(StorageError::Write(failures))
}
