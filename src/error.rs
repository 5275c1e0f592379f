//! Error types for the ADS client.

use std::time::Duration;

/// Errors that can occur when talking to ADS or using the lazy object model.
#[derive(Debug, thiserror::Error)]
pub enum AdsError {
    /// A requested field is not part of the known field vocabulary.
    #[error("Field {0} not valid in search")]
    InvalidField(String),

    /// An operation needed state that was not there yet (e.g. a bibcode).
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A single-key operation was given several keys.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// HTTP 400.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// HTTP 404, or a single-record lookup that matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 499.
    #[error("Server too busy")]
    ServerBusy,

    /// HTTP 500.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any status code without a dedicated kind.
    #[error("Unknown error code {status}: {message}")]
    Unknown { status: u16, message: String },

    /// No API token provided (or HTTP 401).
    #[error("Authentication required: set ADS_DEV_KEY, ADS_API_TOKEN or SCIX_API_TOKEN, write ~/.ads/dev_key, or pass a token to AdsClient::new()")]
    AuthRequired,

    /// HTTP 403.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limited by ADS (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse an API response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A download produced something other than the expected file.
    #[error("Download failed: {0}")]
    Download(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdsError {
    /// Map a non-success HTTP status and its body to an error kind.
    pub(crate) fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let message = error_message(body);
        match status {
            400 => Self::MalformedRequest(message),
            401 => Self::AuthRequired,
            403 => Self::PermissionDenied(message),
            404 => Self::NotFound(if message.is_empty() {
                "Resource not found".to_string()
            } else {
                message
            }),
            429 => Self::RateLimited { retry_after },
            499 => Self::ServerBusy,
            500 => Self::ServerError(message),
            _ => Self::Unknown { status, message },
        }
    }
}

/// ADS reports failures as `{"error": "..."}`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Convenience alias for Results using [`AdsError`].
pub type Result<T> = std::result::Result<T, AdsError>;
