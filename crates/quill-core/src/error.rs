//! Error types for quill-core

use thiserror::Error;

/// Result type alias using quill-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quill-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note not found in the local cache
    #[error("Note not found locally: {0}")]
    NotFound(i64),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote API rejected the request; carries the categorized user message
    #[error("{0}")]
    Api(String),

    /// Transport-level failure talking to the remote service
    #[error("Network error. Please check your connection and try again.")]
    Network,

    /// Remote call succeeded but returned no body where one was expected
    #[error("Empty response body")]
    EmptyResponse,

    /// Offline read with nothing cached to serve
    #[error("No connection and no cached data")]
    NoCachedData,
}
