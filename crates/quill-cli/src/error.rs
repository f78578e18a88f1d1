use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quill_core::Error),
    #[error(transparent)]
    LibSql(#[from] libsql::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Could not determine a data directory; pass --db-path")]
    NoDataDir,
    #[error("Invalid log filter directive: {0}")]
    LogFilter(String),
    #[error(
        "Remote is not configured. Set QUILL_API_URL and QUILL_API_TOKEN (a .env file works too)."
    )]
    RemoteNotConfigured,
    #[error("Invalid remote configuration: {0}")]
    RemoteConfig(String),
}
