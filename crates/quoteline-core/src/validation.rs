//! # Validation Module
//!
//! Input validation for values that enter the engine from outside
//! (configuration, extractor output, direct API calls).
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (CLI / UI)                                            │
//! │  ├── Config file + env parsing                                         │
//! │  └── Rejects missing margin, bad exchange rate                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: quoteline-core                                               │
//! │  ├── THIS MODULE: typed checks on constructed inputs                   │
//! │  └── Clamping (margin) where the engine must never refuse             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Document parsing                                             │
//! │  └── Never rejects: bad lines pass through with a diagnostic           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ADD_ON_QUANTITY, MAX_MARGIN_PERCENT, MIN_ADD_ON_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an add-on multiplier.
///
/// ## Rules
/// - Must be within 1..=10
///
/// ## Example
/// ```rust
/// use quoteline_core::validation::validate_add_on_quantity;
///
/// assert!(validate_add_on_quantity(1).is_ok());
/// assert!(validate_add_on_quantity(10).is_ok());
/// assert!(validate_add_on_quantity(0).is_err());
/// assert!(validate_add_on_quantity(11).is_err());
/// ```
pub fn validate_add_on_quantity(qty: u32) -> ValidationResult<()> {
    if !(MIN_ADD_ON_QUANTITY..=MAX_ADD_ON_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_ADD_ON_QUANTITY as i64,
            max: MAX_ADD_ON_QUANTITY as i64,
        });
    }

    Ok(())
}

/// Validates a margin percentage strictly (no clamping).
///
/// The engine itself clamps; this is for callers that want to reject a
/// typo (e.g. `370` instead of `37`) before it reaches the engine.
pub fn validate_margin_percent(pct: f64) -> ValidationResult<()> {
    if !pct.is_finite() || !(0.0..=MAX_MARGIN_PERCENT as f64).contains(&pct) {
        return Err(ValidationError::OutOfRange {
            field: "margin percent".to_string(),
            min: 0,
            max: MAX_MARGIN_PERCENT as i64,
        });
    }

    Ok(())
}

/// Validates a display exchange rate.
///
/// ## Rules
/// - Must be finite and strictly positive
pub fn validate_exchange_rate(rate: f64) -> ValidationResult<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "exchange rate".to_string(),
        });
    }

    Ok(())
}

/// Parses a margin percentage written by a human (`"37"`, `"37%"`, `" 12.5 "`).
///
/// Only the format is checked; range is left to the engine's clamp.
pub fn parse_margin_percent(input: &str) -> ValidationResult<f64> {
    let trimmed = input.trim().trim_end_matches('%').trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Required {
            field: "margin percent".to_string(),
        });
    }

    let pct = trimmed
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "margin percent".to_string(),
            reason: format!("'{}' is not a number", input.trim()),
        })?;

    Ok(pct)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_add_on_quantity() {
        for qty in 1..=10 {
            assert!(validate_add_on_quantity(qty).is_ok());
        }
        assert!(validate_add_on_quantity(0).is_err());
        assert!(validate_add_on_quantity(11).is_err());
    }

    #[test]
    fn test_validate_margin_percent() {
        assert!(validate_margin_percent(0.0).is_ok());
        assert!(validate_margin_percent(37.0).is_ok());
        assert!(validate_margin_percent(200.0).is_ok());
        assert!(validate_margin_percent(-1.0).is_err());
        assert!(validate_margin_percent(200.5).is_err());
        assert!(validate_margin_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_exchange_rate() {
        assert!(validate_exchange_rate(0.23).is_ok());
        assert!(validate_exchange_rate(0.0).is_err());
        assert!(validate_exchange_rate(-0.23).is_err());
        assert!(validate_exchange_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_margin_percent() {
        assert_eq!(parse_margin_percent("37").unwrap(), 37.0);
        assert_eq!(parse_margin_percent(" 37% ").unwrap(), 37.0);
        assert_eq!(parse_margin_percent("12.5").unwrap(), 12.5);
        assert!(matches!(
            parse_margin_percent(""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            parse_margin_percent("abc"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert_eq!(parse_margin_percent("370").unwrap(), 370.0);
    }
}
