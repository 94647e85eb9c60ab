//! # Error Types
//!
//! Domain-specific error types for quoteline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quoteline-core errors (this file)                                     │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  quoteline-core parser outcome (expression.rs)                         │
//! │  └── ExpressionError  - "not a price" / malformed cost expression      │
//! │                                                                         │
//! │  quoteline-cli errors (app)                                            │
//! │  └── ConfigError      - Bad or missing configuration                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → anyhow (CLI boundary)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT An Error Here
//! Document rewriting never fails. Malformed price lines, out-of-range
//! add-on multipliers and a clamped margin are recorded as
//! [`Diagnostic`](crate::types::Diagnostic)s on the outcome instead.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core pricing errors.
///
/// Raised only when a caller constructs engine inputs directly with values
/// the engine cannot represent.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Add-on quantity outside the accepted range.
    #[error("Add-on quantity {requested} is outside {min}..={max}")]
    QuantityOutOfRange { requested: u32, min: u32, max: u32 },

    /// Exchange rate is zero, negative or not a number.
    #[error("Invalid exchange rate: {0}")]
    InvalidExchangeRate(f64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g. unreadable number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
