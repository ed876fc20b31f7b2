//! Error types for Confer

use thiserror::Error;

/// Result type alias for Confer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Confer operations
///
/// Tool failures have no variant here: tools report problems as text
/// so the next model turn can react to them.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model endpoint transport or protocol failure
    #[error("Model call failed: {0}")]
    Llm(String),

    /// Model output never matched the required schema
    #[error("Model output could not be parsed after {attempts} attempts; last output: {raw}")]
    MalformedModelOutput {
        /// Number of model calls made
        attempts: usize,
        /// Raw text of the last response (or the last call error)
        raw: String,
    },

    /// The transcript did not end with an assistant answer
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Durable store setup or operation failed
    #[error("Persistence unavailable: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "database")]
impl From<confer_db::Error> for Error {
    fn from(err: confer_db::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
