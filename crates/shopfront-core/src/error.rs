//! # Error Types
//!
//! Domain-specific error types for shopfront-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopfront-core errors (this file)                                     │
//! │  ├── CoreError        - Cart and checkout rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shopfront-db errors            shopfront-api errors                   │
//! │  └── DbError                    └── ApiError (remote message kept)     │
//! │                                                                         │
//! │  apps/shopfront                                                        │
//! │  └── AppError ──► ErrorPayload { code, message }  (what the UI shows) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and checkout rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The product is not in the cart.
    ///
    /// ## When This Occurs
    /// - Updating the quantity of a line that was never added
    /// - The line was removed from another tab before the update landed
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(String),

    /// Summing quantities for one product would overflow.
    #[error("Quantity for product {product_id} is too large")]
    QuantityOverflow { product_id: String },

    /// An order cannot be composed from an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A checkout step was reached without the data an earlier step stages.
    ///
    /// ## User Workflow
    /// ```text
    /// Review page opened directly
    ///      │
    ///      ▼
    /// staged shipping address? ── no ──► MissingStagedData("shipping address")
    /// ```
    #[error("Missing {0} for checkout")]
    MissingStagedData(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
