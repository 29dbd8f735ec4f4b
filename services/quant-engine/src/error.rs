//! Engine error taxonomy

use thiserror::Error;

/// Errors raised by the calculation modules and the request router
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Malformed, empty or mismatched input; fatal to the request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A zero-variance denominator made the result undefined
    #[error("Numeric degeneracy: {0}")]
    NumericDegenerate(String),

    /// The request `type` tag is not one the engine serves
    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::NumericDegenerate(message.into())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("malformed payload: {err}"))
    }
}

/// Result alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;
