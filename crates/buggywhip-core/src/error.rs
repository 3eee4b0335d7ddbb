//! Error types for buggywhip core library.

use thiserror::Error;

/// Result type alias using buggywhip Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for buggywhip operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No source file has been loaded
    #[error("file not loaded")]
    NotLoaded,

    /// Requested line lies past the end of the file
    #[error("line number {line} out of range; file has {total} lines")]
    LineOutOfRange { line: usize, total: usize },

    /// Keyword search found nothing
    #[error("keyword not found: {0}")]
    KeywordNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
