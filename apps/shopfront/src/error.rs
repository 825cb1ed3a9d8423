//! # Application Errors
//!
//! `AppError` is what the cart manager, the checkout pipeline and order
//! history return. `ErrorPayload` is what a notification layer receives.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError ──────┐                                                      │
//! │  ValidationError ┤                                                      │
//! │  DbError ────────┼──► AppError ──► ErrorPayload { code, message }       │
//! │  ApiError ───────┤       │                 │                            │
//! │  FieldErrors ────┘       │                 ▼                            │
//! │                          │        toast / inline field messages         │
//! │                          ▼                                              │
//! │            OrderInFlight, Redirect, Unauthenticated, Config             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database details never reach the payload: they are logged and replaced by
//! a generic message. Remote messages are passed through because the store
//! API already words them for shoppers.

use serde::Serialize;
use thiserror::Error;

use shopfront_api::ApiError;
use shopfront_core::{CoreError, FieldErrors, RedirectTarget, ValidationError};
use shopfront_db::DbError;

/// Result type alias for app operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application error.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The shipping form has empty required fields.
    #[error("{0}")]
    InvalidShipping(FieldErrors),

    /// `place_order` was called while a submission is still in flight.
    #[error("An order is already being placed")]
    OrderInFlight,

    /// The operation needs data an earlier checkout step stages.
    #[error("Complete the previous checkout step first")]
    Redirect(RedirectTarget),

    /// The operation needs a signed-in shopper.
    #[error("Sign in required")]
    Unauthenticated,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

// =============================================================================
// Error Payload
// =============================================================================

/// Error as handed to the presentation layer.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "City is required",
///   "fields": { "errors": [{ "field": "city", "message": "City is required" }] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Per-field messages for form errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,

    /// Where to send the shopper for redirect errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectTarget>,
}

/// Error codes for payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Cart precondition failed (unknown line, quantity overflow, empty cart)
    CartError,

    /// Local store failed
    DatabaseError,

    /// The store API answered with an error
    RemoteError,

    /// The store API could not be reached
    NetworkError,

    /// Sign in required, or the session expired
    Unauthenticated,

    /// A checkout step was skipped
    Redirect,

    /// An order submission is already running
    OrderInFlight,

    /// Bad configuration
    ConfigError,

    /// Internal error
    Internal,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ErrorPayload {
            code,
            message: message.into(),
            fields: None,
            redirect: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ErrorPayload::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ErrorPayload::new(ErrorCode::Internal, message)
    }
}

impl From<&DbError> for ErrorPayload {
    fn from(err: &DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ErrorPayload::new(ErrorCode::NotFound, format!("{} not found: {}", entity, id))
            }
            DbError::ConnectionFailed(_) => {
                ErrorPayload::new(ErrorCode::DatabaseError, "Local storage unavailable")
            }
            DbError::MigrationFailed(_) => {
                ErrorPayload::new(ErrorCode::DatabaseError, "Local storage migration failed")
            }
            DbError::PoolExhausted => {
                ErrorPayload::new(ErrorCode::DatabaseError, "Local storage busy")
            }
            other => {
                // Log the actual error but return a generic message
                tracing::error!(error = %other, "Local store operation failed");
                ErrorPayload::new(ErrorCode::DatabaseError, "Local storage operation failed")
            }
        }
    }
}

impl From<&ApiError> for ErrorPayload {
    fn from(err: &ApiError) -> Self {
        let code = match err {
            ApiError::Remote { status: 401 | 403, .. } => ErrorCode::Unauthenticated,
            ApiError::Remote { status: 404, .. } => ErrorCode::NotFound,
            ApiError::Remote { status: 400 | 409 | 422, .. } => ErrorCode::ValidationError,
            ApiError::Remote { .. } | ApiError::Decode(_) | ApiError::InvalidData(_) => {
                ErrorCode::RemoteError
            }
            ApiError::Transport(_) | ApiError::Timeout => ErrorCode::NetworkError,
            ApiError::InvalidUrl(_) | ApiError::InvalidConfig(_) => ErrorCode::ConfigError,
        };
        ErrorPayload::new(code, err.to_string())
    }
}

impl From<&CoreError> for ErrorPayload {
    fn from(err: &CoreError) -> Self {
        let code = match err {
            CoreError::Validation(_) | CoreError::MissingStagedData(_) => {
                ErrorCode::ValidationError
            }
            CoreError::ItemNotInCart(_)
            | CoreError::QuantityOverflow { .. }
            | CoreError::EmptyCart => ErrorCode::CartError,
        };
        ErrorPayload::new(code, err.to_string())
    }
}

impl From<&AppError> for ErrorPayload {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Core(e) => e.into(),
            AppError::Validation(e) => ErrorPayload::validation(e.to_string()),
            AppError::Db(e) => e.into(),
            AppError::Api(e) => e.into(),
            AppError::InvalidShipping(fields) => ErrorPayload {
                fields: Some(fields.clone()),
                ..ErrorPayload::validation(fields.to_string())
            },
            AppError::OrderInFlight => ErrorPayload::new(ErrorCode::OrderInFlight, err.to_string()),
            AppError::Redirect(target) => ErrorPayload {
                redirect: Some(*target),
                ..ErrorPayload::new(ErrorCode::Redirect, err.to_string())
            },
            AppError::Unauthenticated => {
                ErrorPayload::new(ErrorCode::Unauthenticated, err.to_string())
            }
            AppError::Config(_) => ErrorPayload::new(ErrorCode::ConfigError, err.to_string()),
        }
    }
}

impl From<AppError> for ErrorPayload {
    fn from(err: AppError) -> Self {
        ErrorPayload::from(&err)
    }
}

impl std::fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ErrorPayload {}
