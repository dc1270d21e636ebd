//! Error types for character generation.

use std::time::Duration;

/// Longest remote error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while generating character images.
#[derive(Debug, thiserror::Error)]
pub enum CharVizError {
    /// The form input is not usable (e.g. no reference image).
    #[error("{0}")]
    Validation(String),

    /// Generation finished without producing any usable image.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Translation of a description failed. Never surfaced by the orchestrator.
    #[error("translation failed: {0}")]
    Translation(String),

    /// Client configuration is incomplete (e.g. missing API key).
    #[error("configuration error: {0}")]
    Config(String),

    /// API key rejected by the remote service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-suggested delay, if any.
        retry_after: Option<Duration>,
    },

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters or unknown model.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The remote response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., reading a reference image, saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for character generation operations.
pub type Result<T> = std::result::Result<T, CharVizError>;

/// Reads a `Retry-After` header expressed in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Redacts anything that looks like a Google API key and bounds the length.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let redacted = text
        .split_inclusive(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .map(|chunk| {
            let token = chunk.trim_end_matches(|c: char| {
                !(c.is_ascii_alphanumeric() || c == '_' || c == '-')
            });
            if token.starts_with("AIza") && token.len() >= 30 {
                chunk.replacen(token, "[REDACTED]", 1)
            } else {
                chunk.to_string()
            }
        })
        .collect::<String>();

    let trimmed = redacted.trim();
    if trimmed.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let cut: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}
