use super::protocol::Envelope;
use crate::config::ApiConfig;
use crate::error::{Failure, TransportError};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;

/// Request payload. JSON for metadata calls, raw bytes for stored values.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl RequestBody {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Json(value) => Bytes::from(value.to_string()),
            RequestBody::Bytes(bytes) => bytes.clone(),
        }
    }
}

/// A request relative to the account URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Unencoded path segments, e.g. `["storage", "kv", "namespaces"]`.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, segments: Vec<String>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(segments: Vec<String>) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn post(segments: Vec<String>) -> Self {
        Self::new(Method::POST, segments)
    }

    pub fn put(segments: Vec<String>) -> Self {
        Self::new(Method::PUT, segments)
    }

    pub fn delete(segments: Vec<String>) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub fn with_query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_bytes(mut self, body: Bytes) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Value of the first query parameter called `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// `/a/b/c`, unencoded. For logging.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the standard envelope and insists on `success: true`.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<Envelope<T>, Failure> {
        let envelope: Envelope<T> = match serde_json::from_slice(&self.body) {
            Ok(envelope) => envelope,
            Err(e) if self.is_success() => return Err(Failure::Decode(e.to_string())),
            Err(_) => return Err(Failure::Status(self.status)),
        };
        if self.is_success() && envelope.success {
            Ok(envelope)
        } else {
            Err(Failure::Api {
                status: self.status,
                errors: envelope.errors,
            })
        }
    }

    /// Like [`into_result`](Self::into_result) for endpoints whose `result` is irrelevant.
    pub fn into_ack(self) -> Result<(), Failure> {
        self.into_result::<serde_json::Value>().map(|_| ())
    }

    /// Describes a non-success response, using the error envelope when there is one.
    pub fn failure(&self) -> Failure {
        match serde_json::from_slice::<Envelope<serde_json::Value>>(&self.body) {
            Ok(envelope) if !envelope.errors.is_empty() => Failure::Api {
                status: self.status,
                errors: envelope.errors,
            },
            _ => Failure::Status(self.status),
        }
    }
}

/// A response whose body is consumed incrementally.
pub struct StreamingResponse {
    pub status: u16,
    pub body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drains the body into a buffered response.
    pub async fn buffer(self) -> Result<ApiResponse, TransportError> {
        let mut body = Vec::new();
        let mut chunks = self.body;
        while let Some(chunk) = chunks.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(ApiResponse {
            status: self.status,
            body: Bytes::from(body),
        })
    }
}

/// Issues requests against one account with one set of auth headers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;

    async fn send_streaming(&self, request: ApiRequest) -> Result<StreamingResponse, TransportError> {
        let response = self.send(request).await?;
        let body = response.body;
        Ok(StreamingResponse {
            status: response.status,
            body: stream::once(async move { Ok::<_, TransportError>(body) }).boxed(),
        })
    }
}

/// [`Transport`] over `reqwest`.
pub struct HttpTransport {
    http_client: reqwest::Client,
    config: ApiConfig,
}

impl HttpTransport {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, request: &ApiRequest) -> Result<reqwest::Url, TransportError> {
        let mut url = reqwest::Url::parse(&self.config.account_url())
            .map_err(|e| TransportError(format!("invalid base url: {}", e)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError("base url cannot carry a path".to_string()))?;
            segments.pop_if_empty().extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn build(&self, request: ApiRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let url = self.url(&request)?;
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .http_client
            .request(request.method, url)
            .timeout(self.config.timeout);
        for (name, value) in self.config.auth_headers() {
            builder = builder.header(name, value);
        }

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(bytes) => builder
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        };
        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let response = self.build(request)?.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(ApiResponse { status, body })
    }

    async fn send_streaming(&self, request: ApiRequest) -> Result<StreamingResponse, TransportError> {
        let response = self.build(request)?.send().await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(TransportError::from))
            .boxed();
        Ok(StreamingResponse { status, body })
    }
}
