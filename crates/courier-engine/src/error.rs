//! Error types for engine operations.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors from delivering one result record to the application level.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The delivery request failed outright (connect, timeout, body).
    #[error("Delivery request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The sink answered with a non-success status.
    #[error("Delivery rejected with status {status}")]
    Rejected {
        /// HTTP status code returned by the sink.
        status: u16,
    },
}

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Segment failed wire-level validation.
    #[error("Protocol error: {0}")]
    Protocol(#[from] courier_protocol::ProtocolError),

    /// Engine configuration is invalid.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Result delivery failed.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
