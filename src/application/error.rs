//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::ProducerError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Content producer or judge unreachable beyond its retry budget
    #[error("transport failure: {0}")]
    Transport(#[from] ProducerError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
