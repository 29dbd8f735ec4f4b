//! Common error types for services

use thiserror::Error;

/// Service error types
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The worker thread is gone or refused the request
    #[error("Worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// A request with the same correlation id is still in flight
    #[error("Duplicate request id: {0}")]
    DuplicateRequestId(String),

    /// Envelope (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<::config::ConfigError> for ServiceError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias for service plumbing
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
