//! Retrieval errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Search request failed: {0}")]
    Request(String),

    #[error("Search backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed search response: {0}")]
    Malformed(String),

    #[error("Bulk write rejected: {0}")]
    Bulk(String),

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Could not extract text from {path}: {reason}")]
    Extract { path: String, reason: String },

    #[error("Retrieval misconfigured: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RetrievalError {
    fn from(e: reqwest::Error) -> Self {
        RetrievalError::Request(e.to_string())
    }
}
