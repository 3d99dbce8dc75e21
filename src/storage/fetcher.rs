//! Entry Fetcher
//!
//! Reads values for one page of keys concurrently. Results come back in the
//! order of the input keys whatever order the requests complete in.

use super::types::{Value, ValueType};
use crate::error::{Failure, Result, StorageError};
use crate::transport::protocol::{ERROR_KEY_NOT_FOUND, value_endpoint};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Fetches the value of every key in `keys`; `None` marks a key that no longer exists.
///
/// Any other failure fails the whole batch.
pub async fn fetch_values(
    transport: &dyn Transport,
    namespace_id: &str,
    keys: &[String],
    value_type: ValueType,
) -> Result<Vec<Option<Value>>> {
    let fetches = keys.iter().map(|key| async move {
        read_value(transport, namespace_id, key, value_type)
            .await
            .map_err(|failure| StorageError::Fetch {
                key: key.clone(),
                failure,
            })
    });
    futures::future::try_join_all(fetches).await
}

/// Single-entry read shared by `get` and the fetcher.
pub(crate) async fn read_value(
    transport: &dyn Transport,
    namespace_id: &str,
    key: &str,
    value_type: ValueType,
) -> std::result::Result<Option<Value>, Failure> {
    let request = ApiRequest::get(value_endpoint(namespace_id, key));

    if value_type == ValueType::Stream {
        let response = transport.send_streaming(request).await?;
        if response.is_success() {
            return Ok(Some(Value::Stream(response.body)));
        }
        return absent_or_failure(&response.buffer().await?);
    }

    let response = transport.send(request).await?;
    if response.is_success() {
        return value_type.decode(response.body).map(Some);
    }
    absent_or_failure(&response)
}

/// Maps "key not found" to `None`; everything else stays a failure.
pub(crate) fn absent_or_failure(response: &ApiResponse) -> std::result::Result<Option<Value>, Failure> {
    let failure = response.failure();
    if is_not_found(&failure) {
        Ok(None)
    } else {
        Err(failure)
    }
}

pub(crate) fn is_not_found(failure: &Failure) -> bool {
    match failure {
        Failure::Api { errors, .. } => errors.iter().any(|e| e.code == ERROR_KEY_NOT_FOUND),
        _ => false,
    }
}
