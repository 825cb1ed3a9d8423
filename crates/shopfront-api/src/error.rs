//! # API Error Types
//!
//! Error types for calls to the remote store API.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ApiError                                       │
//! │                                                                         │
//! │  Configuration            Transport               Response             │
//! │  ─────────────            ─────────               ────────             │
//! │  InvalidUrl               Transport               Remote{status,msg}   │
//! │  InvalidConfig            Timeout                 Decode               │
//! │                                                   InvalidData          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Remote Messages
//! Non-2xx bodies are searched for a human message in this order:
//! 1. `detail` as a string
//! 2. `detail` as a list of `{ "msg": ... }` entries, joined with "; "
//! 3. `message` as a string
//! 4. `"Request failed with status {code}"`

use serde_json::Value;
use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Remote store API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// The configured base URL is unusable.
    #[error("Invalid API base URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid API configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Connection refused, DNS failure, TLS failure.
    #[error("Could not reach the store: {0}")]
    Transport(String),

    #[error("The store did not answer in time")]
    Timeout,

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// Non-2xx response. `message` is already user-presentable.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// 2xx response whose body is not the expected shape.
    #[error("Unexpected response from the store: {0}")]
    Decode(String),

    /// Well-formed response carrying a value the client cannot represent.
    #[error("Invalid data from the store: {0}")]
    InvalidData(String),
}

impl ApiError {
    /// Builds the error for a non-2xx response from its status and raw body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = remote_message(body)
            .unwrap_or_else(|| format!("Request failed with status {}", status));
        ApiError::Remote { status, message }
    }

    /// HTTP status for remote errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Extracts a human-readable message from an error body.
pub fn remote_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    match value.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => return Some(detail.clone()),
        Some(Value::Array(entries)) => {
            let messages: Vec<&str> = entries
                .iter()
                .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
