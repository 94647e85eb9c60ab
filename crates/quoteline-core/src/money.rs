//! # Money Module
//!
//! Provides the `Yen` type for handling quotation amounts safely.
//!
//! ## Why Integer Yen?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  30000 × 1.00 × 1.07 in f64 = 32100.000000000004                       │
//! │  "Round up to 100" then gives 32200 instead of 32100: the customer     │
//! │  is overcharged a whole rounding step on an exact multiple.             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Yen + basis points                               │
//! │    raw × 10^8 = amount × (10000 + margin_bps) × (10000 + vat_bps)       │
//! │    Rounding is an exact ceiling division on that integer.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quoteline_core::money::Yen;
//!
//! let seat = Yen::new(2800);
//! let two_seats = seat.multiply_quantity(2);
//! assert_eq!(two_seats.amount(), 5600);
//! assert_eq!(two_seats.to_string(), "5600");
//! assert_eq!(Yen::new(170000).formatted(), "¥170,000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Yen Type
// =============================================================================

/// A Japanese-yen amount. Yen has no minor unit, so this is the whole value.
///
/// ## Design Decisions
/// - **u64 (unsigned)**: costs and selling prices are never negative; a
///   negative amount cannot be constructed, only rejected
///   (see [`Yen::try_from_signed`])
/// - **Display is bare digits**: the quotation document format writes
///   prices as `170000+15000(...)`, so `to_string()` must round-trip
///   through the cost-expression grammar
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Yen(u64);

impl Yen {
    /// Creates a yen amount.
    #[inline]
    pub const fn new(amount: u64) -> Self {
        Yen(amount)
    }

    /// Creates a yen amount from a signed value, rejecting negatives.
    ///
    /// ## Example
    /// ```rust
    /// use quoteline_core::money::Yen;
    ///
    /// assert_eq!(Yen::try_from_signed(75000).unwrap().amount(), 75000);
    /// assert!(Yen::try_from_signed(-1).is_err());
    /// ```
    pub fn try_from_signed(amount: i64) -> Result<Self, ValidationError> {
        u64::try_from(amount)
            .map(Yen)
            .map_err(|_| ValidationError::MustNotBeNegative {
                field: "amount".to_string(),
            })
    }

    /// Returns the amount in yen.
    #[inline]
    pub const fn amount(&self) -> u64 {
        self.0
    }

    /// Returns zero yen.
    #[inline]
    pub const fn zero() -> Self {
        Yen(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies a per-unit amount by a quantity.
    ///
    /// Saturates instead of wrapping; quotation amounts are nowhere near
    /// `u64::MAX`, but an absurd input must not panic in release builds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Yen(self.0.saturating_mul(qty as u64))
    }

    /// Rounds up to the next multiple of `step` (no-op on exact multiples).
    ///
    /// ## Example
    /// ```rust
    /// use quoteline_core::money::Yen;
    ///
    /// assert_eq!(Yen::new(2782).round_up_to(100).amount(), 2800);
    /// assert_eq!(Yen::new(2800).round_up_to(100).amount(), 2800);
    /// assert_eq!(Yen::new(10001).round_up_to(1000).amount(), 11000);
    /// ```
    pub fn round_up_to(&self, step: u64) -> Self {
        if step == 0 {
            return *self;
        }
        Yen(self.0.div_ceil(step).saturating_mul(step))
    }

    /// Human-readable form with thousands separators, e.g. `¥170,000`.
    ///
    /// ## Note
    /// For summaries and logs only. Document rewriting uses `Display`.
    pub fn formatted(&self) -> String {
        format!("¥{}", group_thousands(self.0))
    }
}

/// Inserts `,` every three digits from the right.
pub(crate) fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Bare digits, exactly as they appear in a cost expression.
impl fmt::Display for Yen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Yen {
    fn from(amount: u64) -> Self {
        Yen(amount)
    }
}

impl Add for Yen {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Yen(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Yen {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Mul<u32> for Yen {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Yen {
    fn sum<I: Iterator<Item = Yen>>(iter: I) -> Self {
        iter.fold(Yen::zero(), |acc, y| acc + y)
    }
}

impl<'a> Sum<&'a Yen> for Yen {
    fn sum<I: Iterator<Item = &'a Yen>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
