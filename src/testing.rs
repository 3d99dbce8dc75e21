//! Test fixtures: an in-memory model of the KV API, reachable either through a
//! scripted [`MockTransport`] or over real HTTP through [`FakeApiServer`].

use crate::config::{ApiConfig, Credentials};
use crate::error::TransportError;
use crate::transport::protocol::{BulkWriteItem, CreateNamespaceRequest, NamespaceRecord};
use crate::transport::{ApiRequest, ApiResponse, Transport};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, put};
use axum::Router;
use base64::Engine;
use bytes::Bytes;
use dashmap::DashMap;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_NAMESPACE_PAGE: usize = 20;
const DEFAULT_KEY_PAGE: usize = 1000;

// ============================================================
// IN-MEMORY API MODEL
// ============================================================

#[derive(Default)]
struct KvInner {
    namespaces: Vec<NamespaceRecord>,
    values: HashMap<String, BTreeMap<String, Bytes>>,
    next_id: u64,
}

#[derive(Default)]
pub struct KvState {
    inner: Mutex<KvInner>,
}

fn ok(result: serde_json::Value, result_info: serde_json::Value) -> (u16, Bytes) {
    let body = json!({ "success": true, "errors": [], "result": result, "result_info": result_info });
    (200, Bytes::from(body.to_string()))
}

fn err(status: u16, code: i64, message: &str) -> (u16, Bytes) {
    let body = json!({
        "success": false,
        "errors": [{ "code": code, "message": message }],
        "result": null,
    });
    (status, Bytes::from(body.to_string()))
}

fn query_value<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

impl KvState {
    /// Creates a namespace holding `entries` and returns its id.
    pub fn seed(&self, title: &str, entries: &[(&str, &str)]) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("ns-{}", inner.next_id);
        inner.namespaces.push(NamespaceRecord {
            id: id.clone(),
            title: title.to_string(),
        });
        let values = entries
            .iter()
            .map(|(k, v)| (k.to_string(), Bytes::from(v.to_string())))
            .collect();
        inner.values.insert(id.clone(), values);
        id
    }

    pub fn namespace_titles(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.namespaces.iter().map(|ns| ns.title.clone()).collect()
    }

    pub fn stored(&self, namespace_id: &str, key: &str) -> Option<Bytes> {
        let inner = self.inner.lock().unwrap();
        inner.values.get(namespace_id)?.get(key).cloned()
    }

    pub fn handle(&self, method: &str, segments: &[String], query: &[(String, String)], body: &[u8]) -> (u16, Bytes) {
        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mut inner = self.inner.lock().unwrap();

        match (method, segs.as_slice()) {
            ("GET", ["storage", "kv", "namespaces"]) => {
                let page: usize = query_value(query, "page").and_then(|p| p.parse().ok()).unwrap_or(1);
                let per_page: usize = query_value(query, "per_page")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_NAMESPACE_PAGE);
                let total_pages = inner.namespaces.len().div_ceil(per_page).max(1);
                let slice: Vec<_> = inner
                    .namespaces
                    .iter()
                    .skip((page - 1) * per_page)
                    .take(per_page)
                    .cloned()
                    .collect();
                ok(
                    json!(slice),
                    json!({ "page": page, "per_page": per_page, "count": slice.len(), "total_pages": total_pages }),
                )
            }
            ("POST", ["storage", "kv", "namespaces"]) => {
                let Ok(request) = serde_json::from_slice::<CreateNamespaceRequest>(body) else {
                    return err(400, 10026, "invalid request body");
                };
                if inner.namespaces.iter().any(|ns| ns.title == request.title) {
                    return err(400, 10014, "a namespace with this account ID and title already exists");
                }
                inner.next_id += 1;
                let record = NamespaceRecord {
                    id: format!("ns-{}", inner.next_id),
                    title: request.title,
                };
                inner.namespaces.push(record.clone());
                inner.values.insert(record.id.clone(), BTreeMap::new());
                ok(json!(record), serde_json::Value::Null)
            }
            ("DELETE", ["storage", "kv", "namespaces", id]) => {
                let before = inner.namespaces.len();
                inner.namespaces.retain(|ns| ns.id != *id);
                if inner.namespaces.len() == before {
                    return err(404, 10013, "namespace not found");
                }
                inner.values.remove(*id);
                ok(serde_json::Value::Null, serde_json::Value::Null)
            }
            (_, ["storage", "kv", "namespaces", id, rest @ ..]) => {
                let Some(values) = inner.values.get_mut(*id) else {
                    return err(404, 10013, "namespace not found");
                };
                match (method, rest) {
                    ("GET", ["keys"]) => {
                        let limit: usize = query_value(query, "limit")
                            .and_then(|l| l.parse().ok())
                            .unwrap_or(DEFAULT_KEY_PAGE);
                        let offset: usize = query_value(query, "cursor")
                            .and_then(|c| c.strip_prefix("cursor-"))
                            .and_then(|c| c.parse().ok())
                            .unwrap_or(0);
                        let names: Vec<_> = values
                            .keys()
                            .skip(offset)
                            .take(limit)
                            .map(|name| json!({ "name": name }))
                            .collect();
                        let cursor = if offset + limit < values.len() {
                            format!("cursor-{}", offset + limit)
                        } else {
                            String::new()
                        };
                        ok(json!(names), json!({ "count": names.len(), "cursor": cursor }))
                    }
                    ("GET", ["values", key]) => match values.get(*key) {
                        Some(value) => (200, value.clone()),
                        None => err(404, 10009, "get: 'key not found'"),
                    },
                    ("PUT", ["values", key]) => {
                        values.insert(key.to_string(), Bytes::copy_from_slice(body));
                        ok(serde_json::Value::Null, serde_json::Value::Null)
                    }
                    ("DELETE", ["values", key]) => {
                        values.remove(*key);
                        ok(serde_json::Value::Null, serde_json::Value::Null)
                    }
                    ("PUT", ["bulk"]) => {
                        let Ok(items) = serde_json::from_slice::<Vec<BulkWriteItem>>(body) else {
                            return err(400, 10026, "invalid bulk body");
                        };
                        for item in items {
                            let value = if item.base64 {
                                match base64::engine::general_purpose::STANDARD.decode(&item.value) {
                                    Ok(decoded) => Bytes::from(decoded),
                                    Err(_) => return err(400, 10026, "invalid base64 value"),
                                }
                            } else {
                                Bytes::from(item.value)
                            };
                            values.insert(item.key, value);
                        }
                        ok(serde_json::Value::Null, serde_json::Value::Null)
                    }
                    ("DELETE", ["bulk"]) => {
                        let Ok(keys) = serde_json::from_slice::<Vec<String>>(body) else {
                            return err(400, 10026, "invalid bulk body");
                        };
                        for key in keys {
                            values.remove(&key);
                        }
                        ok(serde_json::Value::Null, serde_json::Value::Null)
                    }
                    _ => err(405, 10405, "method not allowed"),
                }
            }
            _ => err(404, 7003, "could not route to endpoint"),
        }
    }
}

// ============================================================
// SCRIPTED TRANSPORT
// ============================================================

/// In-process [`Transport`] with a request log and fault/latency injection.
#[derive(Default)]
pub struct MockTransport {
    pub state: KvState,
    log: Mutex<Vec<ApiRequest>>,
    value_delays: Mutex<HashMap<String, Duration>>,
    create_delay: Mutex<Option<Duration>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    completed_reads: Mutex<Vec<String>>,
    listing_budget: Mutex<Option<usize>>,
    fail_namespace_listing: AtomicBool,
    fail_bulk: AtomicBool,
    fail_namespace_delete: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Number of logged requests with `method` whose path ends with `suffix`.
    pub fn count(&self, method: &str, suffix: &[&str]) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method.as_str() == method && path_ends_with(&r.segments, suffix))
            .count()
    }

    pub fn key_listings(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.as_str() == "GET" && r.segments.last().map(String::as_str) == Some("keys"))
            .collect()
    }

    pub fn delay_value(&self, key: &str, delay: Duration) {
        self.value_delays.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn delay_create(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_read(&self, key: &str) {
        self.failing_reads.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_write(&self, key: &str) {
        self.failing_writes.lock().unwrap().insert(key.to_string());
    }

    /// Lets `pages` key listings through, then breaks the connection.
    pub fn break_listing_after(&self, pages: usize) {
        *self.listing_budget.lock().unwrap() = Some(pages);
    }

    pub fn fail_namespace_listing(&self) {
        self.fail_namespace_listing.store(true, Ordering::SeqCst);
    }

    pub fn fail_bulk(&self) {
        self.fail_bulk.store(true, Ordering::SeqCst);
    }

    pub fn fail_namespace_delete(&self) {
        self.fail_namespace_delete.store(true, Ordering::SeqCst);
    }

    pub fn completed_reads(&self) -> Vec<String> {
        self.completed_reads.lock().unwrap().clone()
    }
}

fn path_ends_with(segments: &[String], suffix: &[&str]) -> bool {
    segments.len() >= suffix.len()
        && segments[segments.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn response((status, body): (u16, Bytes)) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse { status, body })
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());

        let method = request.method.as_str().to_string();
        let tail: Vec<&str> = request.segments.iter().skip(3).map(String::as_str).collect();
        let read_key = match (method.as_str(), tail.as_slice()) {
            ("GET", [_, "values", key]) => Some(key.to_string()),
            _ => None,
        };

        match (method.as_str(), tail.as_slice()) {
            ("GET", []) if self.fail_namespace_listing.load(Ordering::SeqCst) => {
                return Err(TransportError("connection refused".to_string()));
            }
            ("DELETE", [_]) if self.fail_namespace_delete.load(Ordering::SeqCst) => {
                return response(err(403, 10000, "authentication error"));
            }
            ("POST", []) => {
                let delay = *self.create_delay.lock().unwrap();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
            ("GET", [_, "keys"]) => {
                let mut budget = self.listing_budget.lock().unwrap();
                if let Some(remaining) = budget.as_mut() {
                    if *remaining == 0 {
                        return Err(TransportError("connection reset".to_string()));
                    }
                    *remaining -= 1;
                }
            }
            ("GET", [_, "values", key]) => {
                let delay = self.value_delays.lock().unwrap().get(*key).copied();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if self.failing_reads.lock().unwrap().contains(*key) {
                    return response(err(500, 10001, "service unavailable"));
                }
            }
            ("PUT", [_, "values", key]) if self.failing_writes.lock().unwrap().contains(*key) => {
                return response(err(400, 10019, "value too large"));
            }
            (_, [_, "bulk"]) if self.fail_bulk.load(Ordering::SeqCst) => {
                return response(err(400, 10026, "bulk rejected"));
            }
            _ => {}
        }

        let outcome = self.state.handle(
            &method,
            &request.segments,
            &request.query,
            &request.body.to_bytes(),
        );
        if let Some(key) = read_key {
            self.completed_reads.lock().unwrap().push(key);
        }
        response(outcome)
    }
}

// ============================================================
// FAKE HTTP API
// ============================================================

struct FakeApi {
    kv: KvState,
    credentials: Credentials,
    hits: DashMap<String, usize>,
}

/// The KV API model served over HTTP on an ephemeral local port.
pub struct FakeApiServer {
    pub addr: SocketAddr,
    api: Arc<FakeApi>,
}

impl FakeApiServer {
    pub async fn start(credentials: Credentials) -> Self {
        let api = Arc::new(FakeApi {
            kv: KvState::default(),
            credentials,
            hits: DashMap::new(),
        });

        let prefix = "/client/v4/accounts/:account/storage/kv/namespaces";
        let app = Router::new()
            .route(prefix, get(handle_namespaces).post(handle_namespaces))
            .route(&format!("{}/:id", prefix), delete(handle_namespace))
            .route(&format!("{}/:id/keys", prefix), get(handle_keys))
            .route(
                &format!("{}/:id/values/:key", prefix),
                get(handle_value).put(handle_value).delete(handle_value),
            )
            .route(&format!("{}/:id/bulk", prefix), put(handle_bulk).delete(handle_bulk))
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, api }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(self.api.credentials.clone()).with_base_url(&format!("http://{}/client/v4", self.addr))
    }

    pub fn kv(&self) -> &KvState {
        &self.api.kv
    }

    /// Requests served for `"{METHOD} {segments joined by /}"`.
    pub fn hits(&self, route: &str) -> usize {
        self.api.hits.get(route).map(|h| *h).unwrap_or(0)
    }
}

fn kv_segments(extra: &[&str]) -> Vec<String> {
    ["storage", "kv", "namespaces"]
        .iter()
        .chain(extra)
        .map(|s| s.to_string())
        .collect()
}

async fn handle_namespaces(
    State(api): State<Arc<FakeApi>>,
    Path(account): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    dispatch(&api, &account, method, &headers, kv_segments(&[]), &query, &body)
}

async fn handle_namespace(
    State(api): State<Arc<FakeApi>>,
    Path((account, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&api, &account, method, &headers, kv_segments(&[&id]), &[], &body)
}

async fn handle_keys(
    State(api): State<Arc<FakeApi>>,
    Path((account, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    dispatch(&api, &account, method, &headers, kv_segments(&[&id, "keys"]), &query, &[])
}

async fn handle_value(
    State(api): State<Arc<FakeApi>>,
    Path((account, id, key)): Path<(String, String, String)>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    dispatch(&api, &account, method, &headers, kv_segments(&[&id, "values", &key]), &query, &body)
}

async fn handle_bulk(
    State(api): State<Arc<FakeApi>>,
    Path((account, id)): Path<(String, String)>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&api, &account, method, &headers, kv_segments(&[&id, "bulk"]), &[], &body)
}

fn dispatch(
    api: &FakeApi,
    account: &str,
    method: Method,
    headers: &HeaderMap,
    segments: Vec<String>,
    query: &[(String, String)],
    body: &[u8],
) -> Response {
    let route = format!("{} {}", method, segments.join("/"));
    *api.hits.entry(route).or_insert(0) += 1;

    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("");
    let authorized = account == api.credentials.id
        && header_value("X-Auth-Email") == api.credentials.email
        && header_value("X-Auth-Key") == api.credentials.key;

    let (status, body) = if authorized {
        api.kv.handle(method.as_str(), &segments, query, body)
    } else {
        err(403, 10000, "Authentication error")
    };

    let raw_value = method == Method::GET && status == 200 && segments.get(4).map(String::as_str) == Some("values");
    let content_type = if raw_value { "application/octet-stream" } else { "application/json" };
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, content_type)],
        body,
    )
        .into_response()
}
