//! # Cost Expression Parser
//!
//! Turns an operator's cost expression into a [`ParsedCost`].
//!
//! ## Grammar
//! ```text
//! expr  := DIGITS addon*
//!        | DIGITS '(' NOTE ')'
//! addon := '+' DIGITS ('*' DIGITS)? '(' NOTE ')'
//! ```
//!
//! ## Examples
//! ```text
//! "75000"                                          base 75000
//! "75000(3 Baby seat)"                             base 75000, note "3 Baby seat"
//! "170000+15000(Accommodation driver)+2000(Baby seat)"
//!                                                  base 170000, two add-ons
//! "79000+2000*2(Baby seat)"                        base 79000, 2 × 2000 seat
//! ```
//!
//! ## Rules
//! - The trailing `(…)` is a note only when the expression contains no `+`
//!   at all. Nested or repeated trailing parentheticals are not reinterpreted.
//! - Text inside parentheses is never scanned for digits.
//! - A multiplier outside 1..=10 drops that add-on and records a
//!   [`Diagnostic`]; the rest of the expression still parses.

use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::money::Yen;
use crate::types::{AddOnCharge, Diagnostic, DiagnosticKind, ParsedCost};
use crate::validation::validate_add_on_quantity;

// =============================================================================
// Errors
// =============================================================================

/// Why an expression did not parse.
///
/// Neither variant is fatal to a document rewrite: the line is simply
/// left as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The text does not start with a digit, so it is not a price at all.
    #[error("not a price expression")]
    NotAPrice,

    /// Starts like a price but breaks the grammar.
    #[error("malformed cost expression at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

// =============================================================================
// Parser
// =============================================================================

/// Parses a cost expression.
///
/// ## Example
/// ```rust
/// use quoteline_core::expression::parse_cost;
///
/// let cost = parse_cost("79000+2000*2(Baby seat)").unwrap();
/// assert_eq!(cost.base.amount(), 79000);
/// assert_eq!(cost.add_ons[0].quantity, 2);
/// assert_eq!(cost.add_ons[0].label, "Baby seat");
/// ```
pub fn parse_cost(expr: &str) -> Result<ParsedCost, ExpressionError> {
    let source = expr.trim();
    let mut cursor = Cursor::new(source);

    let base_digits = cursor.digits().ok_or(ExpressionError::NotAPrice)?;
    let base = parse_amount(base_digits, 0)?;
    let mut cost = ParsedCost::base_only(base);

    cursor.skip_whitespace();
    if cursor.is_eof() {
        return Ok(cost);
    }

    if cursor.peek() == Some('(') && !source.contains('+') {
        cost.note = Some(cursor.parenthesized()?.to_string());
        cursor.skip_whitespace();
        if !cursor.is_eof() {
            return Err(cursor.malformed("unexpected text after note"));
        }
        return Ok(cost);
    }

    while !cursor.is_eof() {
        if !cursor.eat('+') {
            return Err(cursor.malformed("expected '+' before add-on"));
        }
        cursor.skip_whitespace();

        let amount_at = cursor.pos;
        let amount_digits = cursor
            .digits()
            .ok_or_else(|| cursor.malformed("expected add-on amount"))?;
        let unit_amount = parse_amount(amount_digits, amount_at)?;
        cursor.skip_whitespace();

        let mut multiplier: Option<&str> = None;
        if cursor.eat('*') {
            cursor.skip_whitespace();
            multiplier = Some(
                cursor
                    .digits()
                    .ok_or_else(|| cursor.malformed("expected multiplier after '*'"))?,
            );
            cursor.skip_whitespace();
        }

        if cursor.peek() != Some('(') {
            return Err(cursor.malformed("expected '(' with add-on label"));
        }
        let label = cursor.parenthesized()?;
        cursor.skip_whitespace();

        // Digit runs too long for u32 are out of range like any other.
        let quantity = match multiplier {
            None => 1,
            Some(digits) => digits.parse::<u32>().unwrap_or(u32::MAX),
        };

        if validate_add_on_quantity(quantity).is_err() {
            let shown = multiplier.unwrap_or("1");
            warn!(
                multiplier = shown,
                label = label,
                "Dropping add-on with multiplier outside 1..=10"
            );
            cost.diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidMultiplier,
                format!(
                    "add-on '{}' dropped: multiplier {} is outside 1..=10",
                    label, shown
                ),
            ));
            continue;
        }

        cost.add_ons.push(AddOnCharge {
            unit_amount,
            quantity,
            label: label.to_string(),
        });
    }

    Ok(cost)
}

fn parse_amount(digits: &str, position: usize) -> Result<Yen, ExpressionError> {
    digits
        .parse::<u64>()
        .map(Yen::new)
        .map_err(|_| ExpressionError::Malformed {
            position,
            reason: format!("amount '{}' is too large", digits),
        })
}

// =============================================================================
// Cursor
// =============================================================================

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consumes an ASCII digit run, if any.
    fn digits(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    /// Consumes a balanced `( … )` group and returns its inner text verbatim.
    fn parenthesized(&mut self) -> Result<&'a str, ExpressionError> {
        let open = self.pos;
        let mut depth = 0usize;
        for (offset, ch) in self.rest().char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let inner = &self.src[open + 1..open + offset];
                        self.pos = open + offset + 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
        }
        Err(ExpressionError::Malformed {
            position: open,
            reason: "unclosed '('".to_string(),
        })
    }

    fn malformed(&self, reason: &str) -> ExpressionError {
        ExpressionError::Malformed {
            position: self.pos,
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Serialization
// =============================================================================

/// Canonical cost-expression form; parses back to the same structure.
///
/// `*1` is never written. A note is only written when there are no add-ons.
impl fmt::Display for ParsedCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if self.add_ons.is_empty() {
            if let Some(note) = &self.note {
                write!(f, "({})", note)?;
            }
            return Ok(());
        }
        for add_on in &self.add_ons {
            write!(f, "+{}", add_on.unit_amount)?;
            if add_on.quantity != 1 {
                write!(f, "*{}", add_on.quantity)?;
            }
            write!(f, "({})", add_on.label)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn add_on(unit: u64, quantity: u32, label: &str) -> AddOnCharge {
        AddOnCharge {
            unit_amount: Yen::new(unit),
            quantity,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_bare_base() {
        let cost = parse_cost("75000").unwrap();
        assert_eq!(cost.base.amount(), 75000);
        assert!(cost.add_ons.is_empty());
        assert_eq!(cost.note, None);
    }

    #[test]
    fn test_base_with_note() {
        let cost = parse_cost("75000(3 Baby seat)").unwrap();
        assert_eq!(cost.base.amount(), 75000);
        assert!(cost.add_ons.is_empty());
        assert_eq!(cost.note.as_deref(), Some("3 Baby seat"));
    }

    #[test]
    fn test_two_add_ons_in_order() {
        let cost = parse_cost("170000+15000(Accommodation driver)+2000(Baby seat)").unwrap();
        assert_eq!(cost.base.amount(), 170000);
        assert_eq!(
            cost.add_ons,
            vec![
                add_on(15000, 1, "Accommodation driver"),
                add_on(2000, 1, "Baby seat"),
            ]
        );
        assert_eq!(cost.note, None);
    }

    #[test]
    fn test_add_on_with_multiplier() {
        let cost = parse_cost("79000+2000*2(Baby seat)").unwrap();
        assert_eq!(cost.base.amount(), 79000);
        assert_eq!(cost.add_ons, vec![add_on(2000, 2, "Baby seat")]);
    }

    #[test]
    fn test_digits_in_note_are_not_prices() {
        let cost = parse_cost("75000(2 pax, 4 bags, 1000 km)").unwrap();
        assert_eq!(cost.base.amount(), 75000);
        assert!(cost.add_ons.is_empty());
        assert_eq!(cost.note.as_deref(), Some("2 pax, 4 bags, 1000 km"));
    }

    #[test]
    fn test_digits_in_label_are_not_prices() {
        let cost = parse_cost("90000+3000(2 Baby seat 1-3y)").unwrap();
        assert_eq!(cost.add_ons, vec![add_on(3000, 1, "2 Baby seat 1-3y")]);
    }

    #[test]
    fn test_nested_parentheses_in_label() {
        let cost = parse_cost("90000+3000(Seat (infant))").unwrap();
        assert_eq!(cost.add_ons[0].label, "Seat (infant)");
    }

    #[test]
    fn test_whitespace_between_tokens() {
        let cost = parse_cost("  170000 + 15000 * 2 (Driver) ").unwrap();
        assert_eq!(cost.base.amount(), 170000);
        assert_eq!(cost.add_ons, vec![add_on(15000, 2, "Driver")]);
    }

    #[test]
    fn test_not_a_price() {
        assert_eq!(parse_cost("Route: A -> B"), Err(ExpressionError::NotAPrice));
        assert_eq!(parse_cost(""), Err(ExpressionError::NotAPrice));
        assert_eq!(parse_cost("(75000)"), Err(ExpressionError::NotAPrice));
    }

    #[test]
    fn test_multiplier_out_of_range_drops_add_on() {
        let cost = parse_cost("79000+2000*11(Baby seat)+500(Water)").unwrap();
        assert_eq!(cost.add_ons, vec![add_on(500, 1, "Water")]);
        assert_eq!(cost.diagnostics.len(), 1);
        assert_eq!(cost.diagnostics[0].kind, DiagnosticKind::InvalidMultiplier);

        let cost = parse_cost("79000+2000*0(Baby seat)").unwrap();
        assert!(cost.add_ons.is_empty());
        assert_eq!(cost.diagnostics.len(), 1);

        let cost = parse_cost("79000+2000*99999999999(Baby seat)").unwrap();
        assert!(cost.add_ons.is_empty());
    }

    #[test]
    fn test_multiplier_bounds_accepted() {
        let cost = parse_cost("79000+2000*1(A)+2000*10(B)").unwrap();
        assert_eq!(cost.add_ons[0].quantity, 1);
        assert_eq!(cost.add_ons[1].quantity, 10);
        assert!(cost.diagnostics.is_empty());
    }

    #[test]
    fn test_malformed_expressions() {
        for expr in [
            "79000+2000",          // add-on without label
            "79000+(Seat)",        // add-on without amount
            "79000+2000*(Seat)",   // '*' without multiplier
            "79000+2000(Seat",     // unclosed label
            "75000(Seat) extra",   // text after note
            "75000 THB",           // trailing words
            "79000+2000(A)-500(B)",
            "75000(Seat+bag)",     // '+' anywhere disables the note form
            "99999999999999999999999",
        ] {
            assert!(
                matches!(parse_cost(expr), Err(ExpressionError::Malformed { .. })),
                "expected malformed: {expr}"
            );
        }
    }

    #[test]
    fn test_display_canonical_form() {
        for expr in [
            "75000",
            "75000(3 Baby seat)",
            "170000+15000(Accommodation driver)+2000(Baby seat)",
            "79000+2000*2(Baby seat)",
        ] {
            assert_eq!(parse_cost(expr).unwrap().to_string(), expr);
        }

        // explicit *1 is normalized away
        assert_eq!(
            parse_cost("79000+2000*1(Seat)").unwrap().to_string(),
            "79000+2000(Seat)"
        );
    }

    #[test]
    fn test_reparse_of_display_is_stable() {
        let cost = parse_cost("170000 + 15000*3 (Driver (night)) + 2000(Seat)").unwrap();
        let reparsed = parse_cost(&cost.to_string()).unwrap();
        assert_eq!(reparsed, cost);
    }
}
