//! # Unibell API
//!
//! Thin client for the remote timetable service. Every call is exactly one
//! request/response cycle; retries and caching belong to callers.
//!
//! Failure mapping:
//! - transport failure (DNS, connect, timeout) → `UnibellError::Transient`
//! - non-2xx with an error body → `UnibellError::RemoteRequest`
//! - 2xx with an unparseable body → `UnibellError::Protocol`

pub mod client;
pub mod models;
pub mod request;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use unibell_core::error::{Result, UnibellError};

pub use client::HttpScheduleApi;
pub use request::{ApiRequest, HttpMethod};

/// Raw access to the remote service. Implemented over HTTP in production and
/// by counting fakes in tests.
#[async_trait]
pub trait ScheduleApi: Send + Sync {
    /// Perform one request and return the raw success body.
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>>;
}

/// Decode a success body, mapping parse failures to `Protocol`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| UnibellError::Protocol(format!("Unexpected response body: {e}")))
}
