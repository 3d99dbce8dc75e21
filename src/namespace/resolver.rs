use crate::error::{Failure, Result, StorageError};
use crate::transport::protocol::{
    CreateNamespaceRequest, NAMESPACE_PAGE_SIZE, NamespaceRecord, namespaces_endpoint,
};
use crate::transport::{ApiRequest, Transport};

use std::sync::Arc;

/// A remote namespace. `id` is assigned by the API and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub id: String,
    pub title: String,
}

impl From<NamespaceRecord> for Namespace {
    fn from(record: NamespaceRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
        }
    }
}

/// Whether a missing namespace may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolve {
    CreateIfMissing,
    /// Existence query only; never creates.
    ExistingOnly,
}

pub struct NamespaceResolver {
    transport: Arc<dyn Transport>,
}

impl NamespaceResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Finds the namespace titled `title`, creating it when allowed.
    ///
    /// Returns `Ok(None)` only in [`Resolve::ExistingOnly`] mode.
    pub async fn resolve(&self, title: &str, mode: Resolve) -> Result<Option<Namespace>> {
        if let Some(namespace) = self.find(title).await {
            return Ok(Some(namespace));
        }
        match mode {
            Resolve::ExistingOnly => Ok(None),
            Resolve::CreateIfMissing => self.create(title).await.map(Some),
        }
    }

    /// Scans the account's namespaces for an exact title match; the first match wins.
    ///
    /// A failed listing is reported as "not found".
    pub async fn find(&self, title: &str) -> Option<Namespace> {
        let mut page = 1u32;
        loop {
            let request = ApiRequest::get(namespaces_endpoint())
                .with_query("page", page)
                .with_query("per_page", NAMESPACE_PAGE_SIZE);

            let envelope = match self.transport.send(request).await {
                Ok(response) => response.into_result::<Vec<NamespaceRecord>>(),
                Err(e) => Err(Failure::from(e)),
            };
            let envelope = match envelope {
                Ok(envelope) => envelope,
                Err(failure) => {
                    tracing::warn!("Namespace listing failed, treating '{}' as missing: {}", title, failure);
                    return None;
                }
            };

            let records = envelope.result.unwrap_or_default();
            if let Some(record) = records.iter().find(|ns| ns.title == title) {
                tracing::debug!("Resolved namespace '{}' to {}", title, record.id);
                return Some(record.clone().into());
            }

            let total_pages = envelope
                .result_info
                .and_then(|info| info.total_pages)
                .unwrap_or(1);
            if records.is_empty() || page >= total_pages {
                return None;
            }
            page += 1;
        }
    }

    pub async fn create(&self, title: &str) -> Result<Namespace> {
        let creation_error = |failure| StorageError::NamespaceCreation {
            title: title.to_string(),
            failure,
        };

        let body = serde_json::to_value(CreateNamespaceRequest {
            title: title.to_string(),
        })
        .map_err(|e| creation_error(Failure::Decode(e.to_string())))?;

        let response = self
            .transport
            .send(ApiRequest::post(namespaces_endpoint()).with_json(body))
            .await
            .map_err(|e| creation_error(e.into()))?;

        let record = response
            .into_result::<NamespaceRecord>()
            .map_err(creation_error)?
            .result
            .ok_or_else(|| creation_error(Failure::Decode("create response has no result".to_string())))?;

        tracing::info!("Created namespace '{}' with id {}", record.title, record.id);
        Ok(record.into())
    }
}
