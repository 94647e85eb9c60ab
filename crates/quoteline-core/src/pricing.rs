//! # Selling Price Calculator
//!
//! Cost + margin + VAT, rounded up to a tier-dependent step.
//!
//! ## Formula
//! ```text
//! raw = amount × (1 + margin/100) × (1 + vat/100)
//!
//! In integers (basis points):
//!   raw × 10^8 = amount × (10000 + margin_bps) × (10000 + vat_bps)
//!
//!   ┌──────────────┬──────────────────────────────────────────┐
//!   │ Smart        │ raw ≥ 10,000 → next 1,000, else next 100 │
//!   │ AddOn        │ next 100                                 │
//!   │ FixedThousand│ next 1,000                               │
//!   └──────────────┴──────────────────────────────────────────┘
//! ```
//!
//! ## Add-ons Are Priced Per Unit
//! ```text
//! unit 2000, margin 30%, VAT 7%, qty 2
//!   per-unit raw   = 2000 × 1.30 × 1.07 = 2782
//!   per-unit sell  = 2800                      ← rounded ONCE, per unit
//!   contribution   = 2800 × 2 = 5600           ← NOT round(4000 × 1.391)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::era::normalize_date;
use crate::money::Yen;
use crate::types::{
    AddOnCharge, DayCost, MarginRate, ParsedCost, PricingConfig, RoundingTier, VatRate,
};
use crate::SMART_ROUNDING_THRESHOLD;

const BPS_SCALE: u128 = 10_000;

// =============================================================================
// Core Calculation
// =============================================================================

/// Computes the selling amount for one cost.
///
/// ## Example
/// ```rust
/// use quoteline_core::money::Yen;
/// use quoteline_core::pricing::sell;
/// use quoteline_core::{MarginRate, RoundingTier, VatRate};
///
/// let margin = MarginRate::from_percentage(30.0);
/// let unit = sell(Yen::new(2000), margin, VatRate::STANDARD, RoundingTier::AddOn);
/// assert_eq!(unit.amount(), 2800);
///
/// let day = sell(Yen::new(75000), margin, VatRate::STANDARD, RoundingTier::Smart);
/// assert_eq!(day.amount(), 105000); // 104325 → next 1,000
/// ```
pub fn sell(amount: Yen, margin: MarginRate, vat: VatRate, tier: RoundingTier) -> Yen {
    if amount.is_zero() {
        return Yen::zero();
    }

    // u128: u64 × 30000 × 10700 cannot overflow
    let scaled = amount.amount() as u128
        * (BPS_SCALE + margin.bps() as u128)
        * (BPS_SCALE + vat.bps() as u128);
    let denominator = BPS_SCALE * BPS_SCALE;

    // Smallest whole yen ≥ raw. Rounding that up to a whole step gives the
    // same result as rounding the exact raw value.
    let raw_ceil = u64::try_from(scaled.div_ceil(denominator)).unwrap_or(u64::MAX);
    let raw_is_large = scaled >= SMART_ROUNDING_THRESHOLD as u128 * denominator;

    let step = match tier {
        RoundingTier::Smart if raw_is_large => 1000,
        RoundingTier::Smart => 100,
        RoundingTier::AddOn => 100,
        RoundingTier::FixedThousand => 1000,
    };

    Yen::new(raw_ceil).round_up_to(step)
}

impl PricingConfig {
    /// Sells a day base amount using the configured base rounding.
    pub fn sell_base(&self, amount: Yen) -> Yen {
        sell(amount, self.margin, self.vat, self.base_rounding.tier())
    }

    /// Sells ONE unit of an add-on.
    pub fn sell_add_on_unit(&self, unit_amount: Yen) -> Yen {
        sell(unit_amount, self.margin, self.vat, RoundingTier::AddOn)
    }
}

// =============================================================================
// Priced Cost
// =============================================================================

/// An add-on after pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedAddOn {
    pub label: String,
    pub quantity: u32,
    pub unit_cost: Yen,
    pub unit_price: Yen,
    /// `unit_price × quantity`
    pub line_total: Yen,
}

/// A cost expression after pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedCost {
    pub base_cost: Yen,
    pub base_price: Yen,
    pub add_ons: Vec<PricedAddOn>,
    pub note: Option<String>,
    /// Base price + Σ add-on line totals.
    pub day_total: Yen,
}

impl PricedCost {
    /// The selling-price expression, in the same grammar as the input.
    pub fn to_selling_cost(&self) -> ParsedCost {
        ParsedCost {
            base: self.base_price,
            add_ons: self
                .add_ons
                .iter()
                .map(|a| AddOnCharge {
                    unit_amount: a.unit_price,
                    quantity: a.quantity,
                    label: a.label.clone(),
                })
                .collect(),
            note: self.note.clone(),
            diagnostics: Vec::new(),
        }
    }
}

/// Prices a parsed cost: base via the configured base tier, every add-on
/// per unit via the add-on tier.
///
/// ## Example
/// ```rust
/// use quoteline_core::expression::parse_cost;
/// use quoteline_core::pricing::price_cost;
/// use quoteline_core::PricingConfig;
///
/// let config = PricingConfig::new(30.0, 0.23).unwrap();
/// let priced = price_cost(&parse_cost("79000+2000*2(Baby seat)").unwrap(), &config);
///
/// assert_eq!(priced.add_ons[0].unit_price.amount(), 2800);
/// assert_eq!(priced.add_ons[0].line_total.amount(), 5600);
/// assert_eq!(priced.to_selling_cost().to_string(), "110000+2800*2(Baby seat)");
/// ```
pub fn price_cost(cost: &ParsedCost, config: &PricingConfig) -> PricedCost {
    let base_price = config.sell_base(cost.base);

    let add_ons: Vec<PricedAddOn> = cost
        .add_ons
        .iter()
        .map(|add_on| {
            let unit_price = config.sell_add_on_unit(add_on.unit_amount);
            PricedAddOn {
                label: add_on.label.clone(),
                quantity: add_on.quantity,
                unit_cost: add_on.unit_amount,
                unit_price,
                line_total: unit_price.multiply_quantity(add_on.quantity),
            }
        })
        .collect();

    let day_total = base_price + add_ons.iter().map(|a| a.line_total).sum::<Yen>();

    PricedCost {
        base_cost: cost.base,
        base_price,
        add_ons,
        note: cost.note.clone(),
        day_total,
    }
}

// =============================================================================
// Structured Quote
// =============================================================================

/// One priced day of a structured quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedDay {
    /// Normalized `YYYY-MM-DD` (Gregorian) when the extractor supplied a date.
    pub date: Option<String>,
    pub priced: PricedCost,
}

/// Totals for a whole structured quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub days: Vec<PricedDay>,
    pub grand_total: Yen,
    /// Display-only conversion of `grand_total`.
    pub grand_total_display: f64,
}

/// Prices the per-day output of the structured day extractor.
///
/// Dates are normalized to Gregorian on the way through.
pub fn price_days(days: &[DayCost], config: &PricingConfig) -> QuoteSummary {
    let days: Vec<PricedDay> = days
        .iter()
        .map(|day| PricedDay {
            date: day.date.as_deref().map(normalize_date),
            priced: price_cost(&day.cost, config),
        })
        .collect();

    let grand_total: Yen = days.iter().map(|d| d.priced.day_total).sum();

    QuoteSummary {
        grand_total_display: config.to_display_currency(grand_total),
        days,
        grand_total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parse_cost;
    use crate::types::BaseRounding;

    fn margin(pct: f64) -> MarginRate {
        MarginRate::from_percentage(pct)
    }

    fn sell_at(amount: u64, pct: f64, tier: RoundingTier) -> u64 {
        sell(Yen::new(amount), margin(pct), VatRate::STANDARD, tier).amount()
    }

    #[test]
    fn test_zero_amount_sells_for_zero() {
        for tier in [
            RoundingTier::Smart,
            RoundingTier::AddOn,
            RoundingTier::FixedThousand,
        ] {
            assert_eq!(sell_at(0, 37.0, tier), 0);
        }
    }

    #[test]
    fn test_smart_tier_boundary() {
        // 9999 × 1.07 = 10698.93 → already above the threshold
        let below = sell_at(9999, 0.0, RoundingTier::Smart);
        assert_eq!(below % 100, 0);
        assert!(below >= 9999);
        assert_eq!(below, 11000);

        let at = sell_at(10000, 0.0, RoundingTier::Smart);
        assert_eq!(at % 1000, 0);
        assert!(at >= 10000);
        assert_eq!(at, 11000);

        // 9000 × 1.07 = 9630 → below threshold → next 100
        assert_eq!(sell_at(9000, 0.0, RoundingTier::Smart), 9700);
        // 9345.79 × 1.07 ≈ 9999.99 style values still round to 100s
        assert_eq!(sell_at(9300, 0.0, RoundingTier::Smart), 10000);
    }

    #[test]
    fn test_smart_threshold_is_on_marked_up_value() {
        // cost below 10,000 but marked-up value above it → thousands
        assert_eq!(sell_at(9300, 30.0, RoundingTier::Smart), 13000); // 12936.3
        // same value on the add-on tier stays in hundreds
        assert_eq!(sell_at(9300, 30.0, RoundingTier::AddOn), 13000);
        assert_eq!(sell_at(9000, 0.0, RoundingTier::AddOn), 9700);
    }

    #[test]
    fn test_exact_multiple_is_not_bumped() {
        // f64 gives 32100.000000000004 here
        assert_eq!(sell_at(30000, 0.0, RoundingTier::AddOn), 32100);
    }

    #[test]
    fn test_add_on_tier_always_hundreds() {
        assert_eq!(sell_at(2000, 30.0, RoundingTier::AddOn), 2800);
        assert_eq!(sell_at(15000, 30.0, RoundingTier::AddOn), 20900); // 20865
        assert_eq!(sell_at(1, 0.0, RoundingTier::AddOn), 100);
    }

    #[test]
    fn test_fixed_thousand_tier() {
        assert_eq!(sell_at(2000, 30.0, RoundingTier::FixedThousand), 3000);
        assert_eq!(sell_at(75000, 37.0, RoundingTier::FixedThousand), 110000);
    }

    #[test]
    fn test_margin_is_clamped_to_two_hundred_percent() {
        assert_eq!(
            sell_at(10000, 500.0, RoundingTier::AddOn),
            sell_at(10000, 200.0, RoundingTier::AddOn)
        );
        assert_eq!(sell_at(10000, 200.0, RoundingTier::AddOn), 32100);
    }

    #[test]
    fn test_monotonic_in_amount() {
        for tier in [
            RoundingTier::Smart,
            RoundingTier::AddOn,
            RoundingTier::FixedThousand,
        ] {
            let mut previous = 0;
            for amount in (0..=40_000).step_by(37) {
                let current = sell_at(amount, 37.0, tier);
                assert!(
                    current >= previous,
                    "{tier}: sell({amount}) = {current} < {previous}"
                );
                previous = current;
            }
        }
    }

    #[test]
    fn test_add_on_priced_per_unit_then_multiplied() {
        let config = PricingConfig::new(30.0, 0.23).unwrap();
        let cost = parse_cost("79000+2000*2(Baby seat)").unwrap();
        let priced = price_cost(&cost, &config);

        let seat = &priced.add_ons[0];
        assert_eq!(seat.unit_cost.amount(), 2000);
        assert_eq!(seat.unit_price.amount(), 2800);
        assert_eq!(seat.line_total.amount(), 5600);
        assert_eq!(
            priced.to_selling_cost().to_string(),
            "110000+2800*2(Baby seat)"
        );
    }

    #[test]
    fn test_per_unit_differs_from_pre_multiplied_rounding() {
        let config = PricingConfig::new(0.0, 0.23).unwrap();
        // unit 100 → 107 → 200 per unit, × 10 = 2000
        // pre-multiplied would be 1000 × 1.07 = 1070 → 1100
        let cost = parse_cost("50000+100*10(Towel)").unwrap();
        let priced = price_cost(&cost, &config);
        assert_eq!(priced.add_ons[0].unit_price.amount(), 200);
        assert_eq!(priced.add_ons[0].line_total.amount(), 2000);
    }

    #[test]
    fn test_day_total() {
        let config = PricingConfig::new(37.0, 0.23).unwrap();
        let cost = parse_cost("170000+15000(Accommodation driver)+2000*2(Baby seat)").unwrap();
        let priced = price_cost(&cost, &config);

        // 170000 × 1.37 × 1.07 = 249203 → 250000
        assert_eq!(priced.base_price.amount(), 250000);
        // 15000 × 1.4659 = 21988.5 → 22000
        assert_eq!(priced.add_ons[0].unit_price.amount(), 22000);
        // 2000 × 1.4659 = 2931.8 → 3000
        assert_eq!(priced.add_ons[1].unit_price.amount(), 3000);
        assert_eq!(priced.day_total.amount(), 250000 + 22000 + 6000);
    }

    #[test]
    fn test_base_rounding_fixed_thousand() {
        let config = PricingConfig::new(0.0, 0.23)
            .unwrap()
            .with_base_rounding(BaseRounding::FixedThousand);
        // 5000 × 1.07 = 5350 → smart would give 5400
        assert_eq!(config.sell_base(Yen::new(5000)).amount(), 6000);
        // add-ons are unaffected
        assert_eq!(config.sell_add_on_unit(Yen::new(5000)).amount(), 5400);
    }

    #[test]
    fn test_price_days_summary() {
        let config = PricingConfig::new(37.0, 0.25).unwrap();
        let days = vec![
            DayCost {
                date: Some("15/01/2569".to_string()),
                cost: parse_cost("75000").unwrap(),
            },
            DayCost {
                date: None,
                cost: parse_cost("79000+2000*2(Baby seat)").unwrap(),
            },
        ];

        let summary = price_days(&days, &config);
        assert_eq!(summary.days.len(), 2);
        assert_eq!(summary.days[0].date.as_deref(), Some("2026-01-15"));
        assert_eq!(summary.days[1].date, None);

        // 75000 × 1.4659 = 109942.5 → 110000
        assert_eq!(summary.days[0].priced.day_total.amount(), 110000);
        // 79000 × 1.4659 = 115806.1 → 116000; seat 3000 × 2
        assert_eq!(summary.days[1].priced.day_total.amount(), 122000);
        assert_eq!(summary.grand_total.amount(), 232000);
        assert!((summary.grand_total_display - 58000.0).abs() < 1e-6);
    }
}
