use crate::error::{Failure, TransportError};
use crate::transport::protocol::BulkWriteItem;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;

/// A value to store.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    /// Stored as its JSON text.
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl Payload {
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Text(text) => Bytes::from(text.clone()),
            Payload::Json(value) => Bytes::from(value.to_string()),
            Payload::Bytes(bytes) => bytes.clone(),
        }
    }

    pub(crate) fn to_bulk_item(&self, key: &str, expiry: Option<Expiry>) -> BulkWriteItem {
        let (value, base64) = match self {
            Payload::Text(text) => (text.clone(), false),
            Payload::Json(value) => (value.to_string(), false),
            Payload::Bytes(bytes) => (BASE64.encode(bytes), true),
        };
        BulkWriteItem {
            key: key.to_string(),
            value,
            expiration: match expiry {
                Some(Expiry::At(at)) => Some(at),
                _ => None,
            },
            expiration_ttl: match expiry {
                Some(Expiry::Ttl(ttl)) => Some(ttl),
                _ => None,
            },
            base64,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

/// How a stored value is decoded on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    #[default]
    Text,
    Json,
    Bytes,
    /// The body is handed over as a chunk stream without buffering.
    Stream,
}

impl ValueType {
    /// Decodes an already buffered body.
    pub(crate) fn decode(self, body: Bytes) -> Result<Value, Failure> {
        match self {
            ValueType::Text => String::from_utf8(body.to_vec())
                .map(Value::Text)
                .map_err(|e| Failure::Decode(e.to_string())),
            ValueType::Json => serde_json::from_slice(&body)
                .map(Value::Json)
                .map_err(|e| Failure::Decode(e.to_string())),
            ValueType::Bytes => Ok(Value::Bytes(body)),
            ValueType::Stream => Ok(Value::Stream(
                stream::once(async move { Ok::<_, TransportError>(body) }).boxed(),
            )),
        }
    }
}

/// A value read back from the store.
pub enum Value {
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
    Stream(BoxStream<'static, Result<Bytes, TransportError>>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Reads the whole value into memory, draining a stream if necessary.
    pub async fn into_bytes(self) -> Result<Bytes, TransportError> {
        match self {
            Value::Text(text) => Ok(Bytes::from(text)),
            Value::Json(value) => Ok(Bytes::from(value.to_string())),
            Value::Bytes(bytes) => Ok(bytes),
            Value::Stream(mut chunks) => {
                let mut body = Vec::new();
                while let Some(chunk) = chunks.next().await {
                    body.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(body))
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Value::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Value::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Expiry attached to a write; interpreted by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Absolute time, seconds since the epoch.
    At(u64),
    /// Seconds from now.
    Ttl(u64),
}

impl Expiry {
    pub fn query_param(&self) -> (&'static str, u64) {
        match self {
            Expiry::At(at) => ("expiration", *at),
            Expiry::Ttl(ttl) => ("expiration_ttl", *ttl),
        }
    }
}

/// One record of a multi-entry write. `value: None` deletes the key.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteEntry {
    pub key: String,
    pub value: Option<Payload>,
    pub expiry: Option<Expiry>,
}

impl WriteEntry {
    pub fn new(key: &str, value: impl Into<Payload>) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.into()),
            expiry: None,
        }
    }

    pub fn absent(key: &str) -> Self {
        Self {
            key: key.to_string(),
            value: None,
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: Expiry) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// Options for `keys`/`values`/`entries`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOptions {
    /// Requested page size; a hint to the API, not a cap on the total.
    pub limit: Option<u32>,
    /// Decoding for `values`/`entries`.
    pub value_type: ValueType,
}

impl ListOptions {
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }
}
