//! Remote API error taxonomy and body parsing

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for remote note service calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced by the remote note service client.
///
/// Transport failures (no connectivity, timeout) are kept distinct from
/// non-2xx responses so the repository can pick the right offline fallback.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level failure; no HTTP response was received
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Non-2xx response; carries the categorized user-facing message
    #[error("{message} ({status})")]
    Status { status: u16, message: String },

    /// 2xx response with an empty body where one was expected
    #[error("Empty response body")]
    EmptyBody,

    /// 2xx response whose body failed to parse
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Client construction rejected the configuration
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
}

impl ApiError {
    /// HTTP status code, when the server responded at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<ApiError> for crate::Error {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Transport(_) => Self::Network,
            ApiError::Status { message, .. } => Self::Api(message),
            ApiError::EmptyBody => Self::EmptyResponse,
            ApiError::Decode(error) => Self::Serialization(error),
            ApiError::InvalidConfiguration(message) => Self::InvalidInput(message),
        }
    }
}

/// Structured error body the remote sends on rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

/// One field-level error inside an [`ApiErrorBody`].
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub attr: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub detail: String,
}

/// Map an HTTP status and raw body to a short user-facing message.
///
/// Raw server text is never surfaced; unrecognized statuses fall back to the
/// first structured detail when the body parses, else a generic message.
#[must_use]
pub fn user_message(status: u16, body: &str) -> String {
    match status {
        400 => "Invalid note data. Please check your input.".to_string(),
        401 => "Authentication failed. Please login again.".to_string(),
        403 => "Access denied.".to_string(),
        404 => "Note not found.".to_string(),
        500 => "Server error. Please try again later.".to_string(),
        _ => first_detail(body),
    }
}

fn first_detail(body: &str) -> String {
    if !body.trim().is_empty() {
        if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
            if let Some(first) = parsed.errors.first() {
                if !first.detail.is_empty() {
                    return first.detail.clone();
                }
            }
        }
    }
    "Unknown error occurred".to_string()
}
