//! Error types for unbatch pipelines

use std::io;
use thiserror::Error;

/// Result type for unbatch pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for unbatch pipeline operations
///
/// End of input is never an error: sources and iterators report it as
/// `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    /// Statically known shapes disagree; raised while building a pipeline,
    /// before any data flows
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Observed data violates a shape constraint (leading dimensions differ,
    /// a scalar cannot be split, a tensor is malformed)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A component's kind or element type differs from the declared one
    #[error("Data type mismatch: {0}")]
    TypeMismatch(String),

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Size of the dimension being indexed
        len: usize,
    },

    /// Failure reported by an upstream batch producer
    #[error("Source error: {0}")]
    Source(String),

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A shared iterator's lock was poisoned by a panicking consumer
    #[error("Iterator lock poisoned")]
    Poisoned,
}

impl Error {
    /// Whether this error was raised by a construction-time schema check
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Error::SchemaMismatch(_))
    }

    /// Whether this error was raised by a runtime data check
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
