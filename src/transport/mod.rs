//! Transport Module
//!
//! The boundary between the storage logic and the remote HTTP API.
//!
//! - **`protocol`**: endpoint paths, the response envelope and the other DTOs.
//! - **`client`**: the object-safe [`Transport`] seam and its `reqwest`-backed
//!   implementation, [`HttpTransport`].

pub mod client;
pub mod protocol;

pub use client::{ApiRequest, ApiResponse, HttpTransport, RequestBody, StreamingResponse, Transport};
