//! Error types for doctrans domain values

use thiserror::Error;

/// Result type alias for doctrans domain operations
pub type Result<T> = std::result::Result<T, DocTransError>;

/// Errors raised while parsing or validating domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocTransError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file status: {0}")]
    InvalidStatus(String),
}
