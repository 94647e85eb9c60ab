//! # Domain Types
//!
//! Core domain types used throughout Quoteline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   ParsedCost    │   │  AddOnCharge    │   │ PricingConfig   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  base (Yen)     │──►│  unit_amount    │   │  margin (bps)   │       │
//! │  │  add_ons        │   │  quantity 1..10 │   │  vat (7%)       │       │
//! │  │  note           │   │  label          │   │  exchange_rate  │       │
//! │  └─────────────────┘   └─────────────────┘   │  base_rounding  │       │
//! │                                               └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   MarginRate    │   │  RoundingTier   │   │   Diagnostic    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Smart          │   │  kind           │       │
//! │  │  3700 = 37%     │   │  AddOn          │   │  line           │       │
//! │  │  clamp 0..200%  │   │  FixedThousand  │   │  message        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All of these are ephemeral: built per invocation, dropped once the
//! rewritten text has been produced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Yen;
use crate::validation::{validate_add_on_quantity, validate_exchange_rate};
use crate::{MAX_ADD_ON_QUANTITY, MAX_MARGIN_PERCENT, MIN_ADD_ON_QUANTITY, VAT_PERCENT};

// =============================================================================
// Margin Rate
// =============================================================================

/// Margin markup in basis points (1 bp = 0.01%).
///
/// ## Why Basis Points?
/// Operators quote margins like 37% or 12.5%. Basis points keep those exact
/// as integers so the price arithmetic never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginRate(u32);

impl MarginRate {
    /// Upper bound in basis points (200%).
    pub const MAX_BPS: u32 = MAX_MARGIN_PERCENT * 100;

    /// Creates a margin from basis points, clamped to 0..=200%.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > Self::MAX_BPS {
            MarginRate(Self::MAX_BPS)
        } else {
            MarginRate(bps)
        }
    }

    /// Creates a margin from a percentage, clamped to 0..=200%.
    ///
    /// NaN is treated as 0%.
    ///
    /// ## Example
    /// ```rust
    /// use quoteline_core::MarginRate;
    ///
    /// assert_eq!(MarginRate::from_percentage(37.0).bps(), 3700);
    /// assert_eq!(MarginRate::from_percentage(12.5).bps(), 1250);
    /// assert_eq!(MarginRate::from_percentage(-5.0).bps(), 0);
    /// assert_eq!(MarginRate::from_percentage(250.0).bps(), 20000);
    /// ```
    pub fn from_percentage(pct: f64) -> Self {
        let clamped = if pct.is_nan() {
            0.0
        } else {
            pct.clamp(0.0, MAX_MARGIN_PERCENT as f64)
        };
        MarginRate::from_bps((clamped * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero margin.
    #[inline]
    pub const fn zero() -> Self {
        MarginRate(0)
    }
}

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT in basis points.
///
/// Only [`VatRate::STANDARD`] (7%) exists; the rate is fixed by the business
/// and deliberately not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatRate(u32);

impl VatRate {
    /// The fixed 7% VAT.
    pub const STANDARD: VatRate = VatRate(VAT_PERCENT * 100);

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::STANDARD
    }
}

// =============================================================================
// Rounding
// =============================================================================

/// Round-up granularity applied to a marked-up amount.
///
/// ```text
/// Smart          raw ≥ 10,000 → next 1,000   else → next 100   (day base)
/// AddOn          always next 100                                (add-on unit)
/// FixedThousand  always next 1,000                              (secondary mode)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingTier {
    Smart,
    AddOn,
    FixedThousand,
}

impl fmt::Display for RoundingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundingTier::Smart => write!(f, "smart"),
            RoundingTier::AddOn => write!(f, "addon"),
            RoundingTier::FixedThousand => write!(f, "fixed-thousand"),
        }
    }
}

/// Which tier prices a day's base amount. Add-ons always use
/// [`RoundingTier::AddOn`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "kebab-case")]
pub enum BaseRounding {
    #[default]
    Smart,
    FixedThousand,
}

impl BaseRounding {
    /// The calculator tier this mode maps to.
    pub const fn tier(&self) -> RoundingTier {
        match self {
            BaseRounding::Smart => RoundingTier::Smart,
            BaseRounding::FixedThousand => RoundingTier::FixedThousand,
        }
    }
}

impl FromStr for BaseRounding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "smart" => Ok(BaseRounding::Smart),
            "fixed-thousand" | "fixed_thousand" | "thousand" => Ok(BaseRounding::FixedThousand),
            other => Err(format!("unknown base rounding mode: {}", other)),
        }
    }
}

// =============================================================================
// Pricing Configuration
// =============================================================================

/// Everything the engine needs to turn costs into selling prices.
///
/// ## Fields
/// - `margin`: caller-supplied, no built-in default
/// - `vat`: always 7%
/// - `exchange_rate`: THB per JPY, for display conversion only
/// - `base_rounding`: tier used for day base amounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricingConfig {
    pub margin: MarginRate,
    pub vat: VatRate,
    pub exchange_rate: f64,
    #[serde(default)]
    pub base_rounding: BaseRounding,
}

impl PricingConfig {
    /// Builds a config from a margin percentage and an exchange rate.
    ///
    /// An out-of-range margin is clamped (and logged), never rejected.
    /// A non-positive or non-finite exchange rate is rejected.
    ///
    /// ## Example
    /// ```rust
    /// use quoteline_core::PricingConfig;
    ///
    /// let config = PricingConfig::new(37.0, 0.23).unwrap();
    /// assert_eq!(config.margin.bps(), 3700);
    /// assert_eq!(config.vat.bps(), 700);
    ///
    /// assert!(PricingConfig::new(37.0, 0.0).is_err());
    /// ```
    pub fn new(margin_percent: f64, exchange_rate: f64) -> CoreResult<Self> {
        validate_exchange_rate(exchange_rate)
            .map_err(|_| CoreError::InvalidExchangeRate(exchange_rate))?;

        let margin = MarginRate::from_percentage(margin_percent);
        if margin_out_of_range(margin_percent) {
            warn!(
                requested = margin_percent,
                applied = margin.percentage(),
                "Margin percent clamped"
            );
        }

        Ok(PricingConfig {
            margin,
            vat: VatRate::STANDARD,
            exchange_rate,
            base_rounding: BaseRounding::Smart,
        })
    }

    /// Switches day base amounts to the given rounding mode.
    pub fn with_base_rounding(mut self, base_rounding: BaseRounding) -> Self {
        self.base_rounding = base_rounding;
        self
    }

    /// Converts a yen amount for display in THB.
    ///
    /// Never feeds back into pricing or rounding.
    pub fn to_display_currency(&self, amount: Yen) -> f64 {
        amount.amount() as f64 * self.exchange_rate
    }
}

/// True when the requested margin had to be clamped (NaN included).
fn margin_out_of_range(pct: f64) -> bool {
    !(0.0..=MAX_MARGIN_PERCENT as f64).contains(&pct)
}

// =============================================================================
// Add-On Charge
// =============================================================================

/// A named supplemental charge (baby seat, driver accommodation, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddOnCharge {
    /// Cost of ONE unit. Pricing always works per unit.
    pub unit_amount: Yen,
    /// Number of units, 1..=10.
    pub quantity: u32,
    /// Label text, kept verbatim.
    pub label: String,
}

impl AddOnCharge {
    /// Creates an add-on, validating the quantity.
    pub fn new(unit_amount: Yen, quantity: u32, label: impl Into<String>) -> CoreResult<Self> {
        validate_add_on_quantity(quantity).map_err(|_| CoreError::QuantityOutOfRange {
            requested: quantity,
            min: MIN_ADD_ON_QUANTITY,
            max: MAX_ADD_ON_QUANTITY,
        })?;
        Ok(AddOnCharge {
            unit_amount,
            quantity,
            label: label.into(),
        })
    }

    /// Unit amount × quantity.
    pub fn total(&self) -> Yen {
        self.unit_amount.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Parsed Cost
// =============================================================================

/// The structured form of one cost expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCost {
    /// The day's core charter/transfer cost.
    pub base: Yen,
    /// Add-ons in order of appearance.
    pub add_ons: Vec<AddOnCharge>,
    /// Free text attached to the base (only when there are no add-ons).
    pub note: Option<String>,
    /// Non-fatal problems found while parsing (e.g. dropped add-ons).
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedCost {
    /// A bare base amount.
    pub fn base_only(base: Yen) -> Self {
        ParsedCost {
            base,
            add_ons: Vec::new(),
            note: None,
            diagnostics: Vec::new(),
        }
    }

    /// Base + Σ unit × quantity, at cost.
    pub fn total(&self) -> Yen {
        self.base + self.add_ons.iter().map(AddOnCharge::total).sum::<Yen>()
    }
}

// =============================================================================
// Structured Day (extractor output)
// =============================================================================

/// One day of a quotation as delivered by the structured day extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayCost {
    /// Date as written by the extractor; may be in Buddhist Era.
    pub date: Option<String>,
    pub cost: ParsedCost,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Category of a non-fatal problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Add-on multiplier outside 1..=10; the add-on was dropped.
    InvalidMultiplier,
    /// Line sits where a price belongs but is not a valid cost expression.
    MalformedExpression,
    /// Total line rebuilt from its own terms because no day totals existed.
    TotalFallback,
}

/// A recorded, non-fatal problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based document line, when the problem came from a document.
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            line: None,
            message: message.into(),
        }
    }

    /// Attaches a 1-based line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_from_percentage_clamps() {
        assert_eq!(MarginRate::from_percentage(0.0).bps(), 0);
        assert_eq!(MarginRate::from_percentage(200.0).bps(), 20000);
        assert_eq!(MarginRate::from_percentage(200.01).bps(), 20000);
        assert_eq!(MarginRate::from_percentage(-0.5).bps(), 0);
        assert_eq!(MarginRate::from_percentage(f64::NAN).bps(), 0);
        assert_eq!(MarginRate::from_bps(99_999).bps(), MarginRate::MAX_BPS);
    }

    #[test]
    fn test_vat_is_fixed_at_seven_percent() {
        assert_eq!(VatRate::default(), VatRate::STANDARD);
        assert_eq!(VatRate::STANDARD.bps(), 700);
        assert!((VatRate::STANDARD.percentage() - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pricing_config_rejects_bad_exchange_rate() {
        assert!(PricingConfig::new(30.0, 0.23).is_ok());
        assert!(matches!(
            PricingConfig::new(30.0, -1.0),
            Err(CoreError::InvalidExchangeRate(_))
        ));
        assert!(PricingConfig::new(30.0, f64::NAN).is_err());
        assert!(PricingConfig::new(30.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_pricing_config_clamps_margin() {
        let config = PricingConfig::new(350.0, 0.23).unwrap();
        assert_eq!(config.margin.bps(), 20000);
    }

    #[test]
    fn test_fractional_margin_is_not_out_of_range() {
        assert!(!margin_out_of_range(12.345));
        assert!(!margin_out_of_range(0.0));
        assert!(!margin_out_of_range(200.0));
        assert!(margin_out_of_range(200.01));
        assert!(margin_out_of_range(-0.5));
        assert!(margin_out_of_range(f64::NAN));
    }

    #[test]
    fn test_display_currency() {
        let config = PricingConfig::new(30.0, 0.25).unwrap();
        let thb = config.to_display_currency(Yen::new(10000));
        assert!((thb - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_base_rounding_parse() {
        assert_eq!("smart".parse::<BaseRounding>(), Ok(BaseRounding::Smart));
        assert_eq!(
            "Fixed-Thousand".parse::<BaseRounding>(),
            Ok(BaseRounding::FixedThousand)
        );
        assert!("ceil".parse::<BaseRounding>().is_err());
        assert_eq!(BaseRounding::default().tier(), RoundingTier::Smart);
    }

    #[test]
    fn test_add_on_quantity_validated() {
        assert!(AddOnCharge::new(Yen::new(2000), 1, "Baby seat").is_ok());
        assert!(AddOnCharge::new(Yen::new(2000), 10, "Baby seat").is_ok());
        assert!(AddOnCharge::new(Yen::new(2000), 0, "Baby seat").is_err());
        assert!(matches!(
            AddOnCharge::new(Yen::new(2000), 11, "Baby seat"),
            Err(CoreError::QuantityOutOfRange {
                requested: 11,
                min: 1,
                max: 10
            })
        ));
    }

    #[test]
    fn test_parsed_cost_total() {
        let cost = ParsedCost {
            base: Yen::new(79000),
            add_ons: vec![AddOnCharge::new(Yen::new(2000), 2, "Baby seat").unwrap()],
            note: None,
            diagnostics: Vec::new(),
        };
        assert_eq!(cost.total().amount(), 83000);
    }

    #[test]
    fn test_parsed_cost_json_shape() {
        let cost = ParsedCost::base_only(Yen::new(75000));
        let json = serde_json::to_value(&cost).unwrap();
        assert_eq!(json["base"], 75000);
        assert_eq!(json["addOns"].as_array().map(Vec::len), Some(0));
        assert_eq!(json["diagnostics"].as_array().map(Vec::len), Some(0));

        let back: ParsedCost = serde_json::from_str(r#"{"base":75000,"addOns":[],"note":null}"#).unwrap();
        assert_eq!(back, cost);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(DiagnosticKind::InvalidMultiplier, "dropped").at_line(7);
        assert_eq!(diag.to_string(), "line 7: dropped");
    }
}
