//! Error types for OpenSearch operations.

use thiserror::Error;

/// Errors that can occur while talking to OpenSearch.
#[derive(Error, Debug)]
pub enum OpenSearchError {
    /// Transport-level failure (connection refused, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The cluster answered with a non-success status.
    #[error("{method} {path} failed with status {status}: {body}")]
    Status {
        status: u16,
        method: String,
        path: String,
        body: String,
    },

    /// Response body was not the JSON we expected.
    #[error("Unexpected response from {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    /// A seed document was not a JSON object.
    #[error("Document #{0} is not a JSON object")]
    NotADocument(usize),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
