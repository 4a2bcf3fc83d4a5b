//! Error types for memoria.

use thiserror::Error;

use crate::embedding::EncodingError;
use crate::store::StoreError;

/// Main error type for memoria operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input text is empty or whitespace-only.
    #[error("Input cannot be empty")]
    EmptyInput,

    /// Input text exceeds the accepted length.
    #[error("Input too long: {actual_length} bytes (maximum {max_length})")]
    InputTooLong {
        max_length: usize,
        actual_length: usize,
    },

    /// Any other rejected request parameter.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Embedding generation failed.
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Vector store operation failed.
    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used to map failures onto responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was bad; retrying it unchanged will fail again.
    Validation,
    /// The embedder could not encode the input.
    Encoding,
    /// The vector store is unavailable or failed the operation.
    Storage,
    /// The service is misconfigured (includes dimensionality mismatches).
    Configuration,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Storage => "storage",
            ErrorKind::Configuration => "configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyInput | Error::InputTooLong { .. } | Error::Validation(_) => {
                ErrorKind::Validation
            }
            Error::Encoding(EncodingError::DimensionMismatch { .. }) => ErrorKind::Configuration,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Store(e) if e.is_fatal() => ErrorKind::Configuration,
            Error::Store(_) => ErrorKind::Storage,
            Error::Config(_) | Error::Io(_) | Error::Json(_) => ErrorKind::Configuration,
        }
    }

    /// True when the caller sent input that can never succeed.
    ///
    /// Covers validation failures and text the model rejects as too long.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Error::Encoding(EncodingError::InputTooLong { .. })
        ) || self.kind() == ErrorKind::Validation
    }
}
