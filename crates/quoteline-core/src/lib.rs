//! # quoteline-core: Pure Pricing Logic for Quotations
//!
//! This crate turns an operator's cost-price quotation into a customer
//! selling-price quotation. It contains all pricing rules as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Quoteline Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 quoteline-cli (apps/quoteline-cli)              │   │
//! │  │    config file + env ──► rewrite / parse / date / watch        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ quoteline-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ expression │  │  pricing  │  │ document  │  │    era    │  │   │
//! │  │   │ parse_cost │  │   sell    │  │  rewrite  │  │ normalize │  │   │
//! │  │   └────────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌────────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types    │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   └────────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO FILES • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`expression`] - Cost expression grammar (`79000+2000*2(Baby seat)`)
//! - [`pricing`] - Margin, VAT and rounding tiers
//! - [`document`] - Line classification and document rewriting
//! - [`era`] - Buddhist Era / short year normalization
//! - [`types`] - Domain types (rates, config, parsed costs, diagnostics)
//! - [`money`] - Whole-yen type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input checks
//!
//! ## Example Usage
//!
//! ```rust
//! use quoteline_core::{parse_cost, price_cost, PricingConfig};
//!
//! let config = PricingConfig::new(37.0, 0.23).unwrap();
//! let cost = parse_cost("79000+2000*2(Baby seat)").unwrap();
//! let priced = price_cost(&cost, &config);
//!
//! assert_eq!(priced.base_price.amount(), 116000);
//! assert_eq!(priced.day_total.amount(), 122000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod era;
pub mod error;
pub mod expression;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{classify, rewrite, rewrite_with_customer, LineRole, RewriteOutcome};
pub use era::{normalize_date, normalize_year};
pub use error::{CoreError, CoreResult, ValidationError};
pub use expression::{parse_cost, ExpressionError};
pub use money::Yen;
pub use pricing::{price_cost, price_days, sell, PricedCost, QuoteSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Thai VAT applied on top of the marked-up cost.
pub const VAT_PERCENT: u32 = 7;

/// Margins above this are clamped down to it.
///
/// ## Business Reason
/// Stops a slipped digit (`370` for `37`) from quoting 4× the cost.
pub const MAX_MARGIN_PERCENT: u32 = 200;

/// Smallest accepted add-on multiplier.
pub const MIN_ADD_ON_QUANTITY: u32 = 1;

/// Largest accepted add-on multiplier.
pub const MAX_ADD_ON_QUANTITY: u32 = 10;

/// Selling values at or above this round to the next 1,000 under the smart
/// tier; below it, to the next 100.
pub const SMART_ROUNDING_THRESHOLD: u64 = 10_000;

/// A price line must start with at least this many digits.
pub const MIN_PRICE_DIGITS: usize = 4;

/// Everything from this line down is policy text, never prices.
pub const RULES_MARKER: &str = "WAITING TIME RULES";
