//! Iteration handles returned by `keys`, `values` and `entries`.
//!
//! Each handle is a fresh, forward-only traversal. `next_batch` pulls exactly one
//! listing page (plus, for values/entries, that page's value fetches) and
//! returns `None` at the end of the sequence.

use super::fetcher::fetch_values;
use super::lister::KeyLister;
use super::types::{Value, ValueType};
use crate::error::{Result, StorageError};
use crate::transport::Transport;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;

pub struct Keys {
    lister: KeyLister,
}

impl Keys {
    pub(crate) fn new(lister: KeyLister) -> Self {
        Self { lister }
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<String>>> {
        self.lister.next_page().await
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<String>> {
        self.lister.into_stream()
    }
}

pub struct Values {
    entries: Entries,
}

impl Values {
    pub(crate) fn new(entries: Entries) -> Self {
        Self { entries }
    }

    pub async fn next_batch(&mut self) -> Result<Option<Vec<Option<Value>>>> {
        let batch = self.entries.next_batch().await?;
        Ok(batch.map(|entries| entries.into_iter().map(|(_, value)| value).collect()))
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<Option<Value>>> {
        self.entries
            .into_stream()
            .map_ok(|(_, value)| value)
            .boxed()
    }
}

pub struct Entries {
    lister: KeyLister,
    transport: Arc<dyn Transport>,
    namespace_id: String,
    value_type: ValueType,
    /// Keys pulled from the lister whose values have not been delivered yet.
    pending: Option<Vec<String>>,
    aborted: bool,
}

impl Entries {
    pub(crate) fn new(
        lister: KeyLister,
        transport: Arc<dyn Transport>,
        namespace_id: &str,
        value_type: ValueType,
    ) -> Self {
        Self {
            lister,
            transport,
            namespace_id: namespace_id.to_string(),
            value_type,
            pending: None,
            aborted: false,
        }
    }

    /// A failed value fetch ends the traversal like a failed listing does.
    ///
    /// A page stays pending until its values are fetched, so a batch whose
    /// future was dropped mid-fetch is retried by the next call.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<(String, Option<Value>)>>> {
        if self.aborted {
            return Ok(None);
        }
        if self.pending.is_none() {
            let Some(keys) = self.lister.next_page().await? else {
                return Ok(None);
            };
            self.pending = Some(keys);
        }
        let Some(keys) = self.pending.as_deref() else {
            return Ok(None);
        };

        let values = fetch_values(
            self.transport.as_ref(),
            &self.namespace_id,
            keys,
            self.value_type,
        )
        .await
        .inspect_err(|_| self.aborted = true)?;

        let keys = self.pending.take().unwrap_or_default();
        Ok(Some(keys.into_iter().zip(values).collect()))
    }

    pub fn into_stream(self) -> BoxStream<'static, Result<(String, Option<Value>)>> {
        stream::try_unfold(self, |mut entries| async move {
            let batch = entries.next_batch().await?;
            Ok::<_, StorageError>(batch.map(|batch| (batch, entries)))
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<_, StorageError>)))
        .try_flatten()
        .boxed()
    }
}
