//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Failure at the content-producer or judge boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// A single failed call; the expander spends one retry attempt on it.
    #[error("producer call failed: {0}")]
    Transient(String),

    /// Transport retry budget used up; aborts the whole build.
    #[error("producer unavailable after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
}

impl ProducerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProducerError::Exhausted { .. })
    }
}

/// Infrastructure errors wrap application errors and add I/O-level concerns.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid replay script: {message}")]
    Replay { message: String },
}

impl InfraError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
