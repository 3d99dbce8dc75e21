//! Error Taxonomy
//!
//! Every failed remote call surfaces as a [`StorageError`] whose variant names the
//! operation class that failed, wrapping a [`Failure`] that carries the remote
//! error codes/messages when the API returned them, or a transport-level
//! description otherwise.

use crate::transport::protocol::ApiError;
use thiserror::Error;

/// Why a single remote call did not succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// The API answered with an error envelope.
    #[error("api error (status {status}): {}", format_api_errors(.errors))]
    Api { status: u16, errors: Vec<ApiError> },

    /// Non-success status without a parseable error envelope.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The request never produced a response (connect, timeout, body read).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but its body could not be decoded.
    #[error("decode failure: {0}")]
    Decode(String),
}

impl Failure {
    /// First remote error code, if the API reported any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Failure::Api { errors, .. } => errors.first().map(|e| e.code),
            _ => None,
        }
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::Transport(err.0)
    }
}

fn format_api_errors(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raised by a [`Transport`](crate::transport::Transport) when no response was obtained.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The namespace could not be found and creating it failed.
    #[error("failed to create namespace '{title}': {failure}")]
    NamespaceCreation { title: String, failure: Failure },

    /// A key listing page (or the namespace listing) could not be fetched.
    #[error("failed to list keys: {0}")]
    Listing(Failure),

    /// A value fetch inside an iteration page failed for a reason other than "not found".
    #[error("failed to fetch value for key '{key}': {failure}")]
    Fetch { key: String, failure: Failure },

    /// One or more writes/deletes failed. Writes already applied remotely are not rolled back.
    #[error("write failed: {}", format_write_failures(.0))]
    Write(Vec<WriteFailure>),

    /// A single-entry read failed for a reason other than "not found".
    #[error("failed to read key '{key}': {failure}")]
    Read { key: String, failure: Failure },

    /// Deleting the namespace failed.
    #[error("failed to clear namespace: {0}")]
    Clear(Failure),

    /// Credentials or API configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// One failed entry inside a [`StorageError::Write`].
#[derive(Debug, Clone, PartialEq)]
pub struct WriteFailure {
    /// `None` when the failure belongs to a whole bulk request rather than a single key.
    pub key: Option<String>,
    pub failure: Failure,
}

fn format_write_failures(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(|f| match &f.key {
            Some(key) => format!("'{}': {}", key, f.failure),
            None => format!("bulk: {}", f.failure),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, StorageError>;
