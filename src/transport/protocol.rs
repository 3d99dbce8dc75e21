//! KV API Protocol
//!
//! Endpoint builders and Data Transfer Objects for the account-scoped
//! `storage/kv` API. Paths are returned as unencoded segments relative to the
//! account URL; the transport is responsible for percent-encoding them.

use serde::{Deserialize, Serialize};

/// Error code the API uses for "key not found" on value reads.
pub const ERROR_KEY_NOT_FOUND: i64 = 10009;

/// Page size used when scanning the account's namespaces.
pub const NAMESPACE_PAGE_SIZE: u32 = 100;

// --- API Endpoints ---

fn kv_root() -> Vec<String> {
    vec!["storage".to_string(), "kv".to_string(), "namespaces".to_string()]
}

/// `storage/kv/namespaces`: list (GET) and create (POST).
pub fn namespaces_endpoint() -> Vec<String> {
    kv_root()
}

/// `storage/kv/namespaces/{id}`: delete (DELETE).
pub fn namespace_endpoint(namespace_id: &str) -> Vec<String> {
    let mut segments = kv_root();
    segments.push(namespace_id.to_string());
    segments
}

/// `storage/kv/namespaces/{id}/keys`: paginated key listing.
pub fn keys_endpoint(namespace_id: &str) -> Vec<String> {
    let mut segments = namespace_endpoint(namespace_id);
    segments.push("keys".to_string());
    segments
}

/// `storage/kv/namespaces/{id}/values/{key}`: single-entry read, write and delete.
pub fn value_endpoint(namespace_id: &str, key: &str) -> Vec<String> {
    let mut segments = namespace_endpoint(namespace_id);
    segments.push("values".to_string());
    segments.push(key.to_string());
    segments
}

/// `storage/kv/namespaces/{id}/bulk`: multi-entry write (PUT) and delete (DELETE).
pub fn bulk_endpoint(namespace_id: &str) -> Vec<String> {
    let mut segments = namespace_endpoint(namespace_id);
    segments.push("bulk".to_string());
    segments
}

// --- Data Transfer Objects ---

/// One entry of the `errors` array of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
}

/// The standard response wrapper returned by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiError>,
    pub result: Option<T>,
    pub result_info: Option<ResultInfo>,
}

/// Pagination metadata. Key listings use `cursor`; namespace listings use page numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Continuation token; absent or empty on the last page.
    pub cursor: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub count: Option<u32>,
    pub total_pages: Option<u32>,
}

impl ResultInfo {
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// A namespace as listed or created by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub id: String,
    pub title: String,
}

/// Body of the create-namespace request.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNamespaceRequest {
    pub title: String,
}

/// A key descriptor from a listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
}

/// One record of a bulk write. Binary values travel base64-encoded with `base64: true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkWriteItem {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_ttl: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub base64: bool,
}
