//! Unibell error types.

use thiserror::Error;

/// Unified error type for every Unibell crate.
#[derive(Error, Debug)]
pub enum UnibellError {
    /// Network-level failure (DNS, connect, timeout). Callers may retry later
    /// or fall back to cached data.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Remote service answered with a non-success status and a structured body.
    #[error("Remote request failed with status {status_code}: {body}")]
    RemoteRequest {
        status_code: u16,
        body: serde_json::Value,
    },

    /// Remote service answered with a success status but the body is unusable.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Caller passed arguments that can never succeed (e.g. an inverted range).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UnibellError {
    /// Whether the failure is network-level and worth degrading around.
    pub fn is_transient(&self) -> bool {
        matches!(self, UnibellError::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, UnibellError>;
