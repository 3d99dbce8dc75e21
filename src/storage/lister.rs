//! Paginated Key Lister
//!
//! Walks the key listing of one namespace page by page, following the
//! continuation cursor the API hands back. One request per [`KeyLister::next_page`]
//! call; nothing is fetched ahead of the consumer.

use crate::error::{Failure, Result, StorageError};
use crate::transport::protocol::{KeyRecord, keys_endpoint};
use crate::transport::{ApiRequest, Transport};

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;

pub struct KeyLister {
    transport: Arc<dyn Transport>,
    namespace_id: String,
    limit: Option<u32>,
    cursor: Option<String>,
    done: bool,
}

impl KeyLister {
    pub fn new(transport: Arc<dyn Transport>, namespace_id: &str, limit: Option<u32>) -> Self {
        Self {
            transport,
            namespace_id: namespace_id.to_string(),
            limit,
            cursor: None,
            done: false,
        }
    }

    fn request(&self) -> ApiRequest {
        let mut request = ApiRequest::get(keys_endpoint(&self.namespace_id));
        if let Some(limit) = self.limit {
            request = request.with_query("limit", limit);
        }
        if let Some(cursor) = &self.cursor {
            request = request.with_query("cursor", cursor);
        }
        request
    }

    /// Fetches the next page of key names, or `None` once the last page was returned.
    ///
    /// A failed request ends the traversal; later calls return `None`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.done {
            return Ok(None);
        }

        let outcome = match self.transport.send(self.request()).await {
            Ok(response) => response.into_result::<Vec<KeyRecord>>(),
            Err(e) => Err(Failure::from(e)),
        };
        let envelope = match outcome {
            Ok(envelope) => envelope,
            Err(failure) => {
                self.done = true;
                tracing::error!("Key listing for namespace {} failed: {}", self.namespace_id, failure);
                return Err(StorageError::Listing(failure));
            }
        };

        self.cursor = envelope
            .result_info
            .as_ref()
            .and_then(|info| info.next_cursor())
            .map(str::to_string);
        if self.cursor.is_none() {
            self.done = true;
        }

        let keys: Vec<String> = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|record| record.name)
            .collect();
        tracing::debug!(
            "Listed {} keys from namespace {} (more: {})",
            keys.len(),
            self.namespace_id,
            !self.done
        );
        Ok(Some(keys))
    }

    /// Flattens the pages into a stream of key names.
    pub fn into_stream(self) -> BoxStream<'static, Result<String>> {
        stream::try_unfold(self, |mut lister| async move {
            let page = lister.next_page().await?;
            Ok::<_, StorageError>(page.map(|keys| (keys, lister)))
        })
        .map_ok(|keys| stream::iter(keys.into_iter().map(Ok::<_, StorageError>)))
        .try_flatten()
        .boxed()
    }
}
