//! Error types for hearth-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using hearth-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hearth-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// No sync endpoint has been configured
    #[error("Sync is not configured")]
    Unconfigured,

    /// Remote endpoint could not be read or written
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Another sync already holds the in-flight guard
    #[error("A sync is already in progress")]
    ConcurrentSyncRejected,

    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Local store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures of a single request/response exchange with the remote endpoint.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{method} failed ({status})")]
    Status { method: &'static str, status: u16 },
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {}s", after.as_secs())]
    Timeout { after: Duration },
    #[error("Invalid remote payload: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status carried by the failure, if the server answered at all.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
