//! Error types for the ingestion core

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown inline when text extraction fails
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Failed to extract text from file. The file may be corrupted or unsupported.";

/// Message shown inline when a file produced nothing to upload
pub const EMPTY_CHUNK_SET_MESSAGE: &str =
    "No text content could be found in this file to process.";

/// Ingestion errors
#[derive(Debug, Error)]
pub enum Error {
    /// File rejected before extraction (size or type)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// File could not be decoded or decoded to empty text
    #[error("Failed to extract text from '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// Chunking produced zero chunks
    #[error("Nothing to chunk: extracted text contains no paragraphs")]
    EmptyChunkSet,

    /// A second extraction was started while one is still running
    #[error("An extraction is already in progress")]
    ExtractionInProgress,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Access token could not be refreshed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Material service answered with a non-success status
    #[error("Material service error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Text to surface next to the upload control.
    ///
    /// Extraction details stay in logs; the user only sees the generic
    /// message and is expected to pick a different file.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(msg) => msg.clone(),
            Error::Extraction { .. } => EXTRACTION_FAILED_MESSAGE.to_string(),
            Error::EmptyChunkSet => EMPTY_CHUNK_SET_MESSAGE.to_string(),
            Error::ExtractionInProgress => "Please wait for the current file to finish processing.".to_string(),
            Error::Auth(_) => "Your session has expired. Please sign in again.".to_string(),
            Error::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Validation, extraction and empty-chunk failures need a different file.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
