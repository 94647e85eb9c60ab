//! # Date Era Normalizer
//!
//! Quotations arrive with years in whatever form the operator (or the
//! upstream extractor) wrote them: Buddhist Era, two-digit short forms, or
//! already-Gregorian. Everything here is pure and total: it never fails and
//! always returns its best guess.
//!
//! ## Year Table
//! ```text
//! ┌──────────────────────┬────────────────────────────────┬──────────────┐
//! │ year                 │ gregorian                      │ example      │
//! ├──────────────────────┼────────────────────────────────┼──────────────┤
//! │ ≥ 2500               │ year − 543     (BE, 4-digit)   │ 2569 → 2026  │
//! │ 2050 ..< 2100        │ year − 43      (BE short + 2000│ 2069 → 2026  │
//! │                      │                 by extractor)  │              │
//! │ 100 ..< 200          │ 2500 + (year−100) − 543 + 100  │ 169 → 2126   │
//! │ 50 ..< 100           │ 2500 + year − 543 (BE short)   │ 69 → 2026    │
//! │ < 50                 │ 2000 + year    (CE short)      │ 26 → 2026    │
//! │ anything else        │ unchanged                      │ 2026 → 2026  │
//! └──────────────────────┴────────────────────────────────┴──────────────┘
//! ```
//!
//! The `100 ..< 200` row is inherited and almost certainly unreachable from
//! real input. It is kept as-is until someone can say what it was for.

use chrono::NaiveDate;

const BE_OFFSET: u32 = 543;

// =============================================================================
// Year
// =============================================================================

/// Maps an ambiguous year to its Gregorian value.
///
/// ## Example
/// ```rust
/// use quoteline_core::era::normalize_year;
///
/// assert_eq!(normalize_year(69), 2026);
/// assert_eq!(normalize_year(26), 2026);
/// assert_eq!(normalize_year(2569), 2026);
/// assert_eq!(normalize_year(2069), 2026);
/// assert_eq!(normalize_year(2026), 2026);
/// ```
pub fn normalize_year(year: u32) -> u32 {
    match year {
        2500..=u32::MAX => year - BE_OFFSET,
        2050..=2099 => year - 43,
        100..=199 => 2500 + (year - 100) - BE_OFFSET + 100,
        50..=99 => 2500 + year - BE_OFFSET,
        0..=49 => 2000 + year,
        _ => year,
    }
}

// =============================================================================
// Date
// =============================================================================

/// Normalizes a date string to `YYYY-MM-DD` (Gregorian).
///
/// Accepted shapes:
/// - `2569-01-15`, `2026/1/15` (year first when it has 3+ digits)
/// - `15/01/69`, `15-1-2569`, `15.01.2026` (day first)
/// - `15 Jan 2569`, `15 January 26`, `Jan 15 2026`, `Mon 15 Jan 2026`
/// - `20260115`
/// - a bare year (`69`, `2569`), returned as the 4-digit Gregorian year
///
/// Anything else comes back trimmed and otherwise untouched.
///
/// ## Example
/// ```rust
/// use quoteline_core::era::normalize_date;
///
/// assert_eq!(normalize_date("15/01/2569"), "2026-01-15");
/// assert_eq!(normalize_date("15 Jan 69"), "2026-01-15");
/// assert_eq!(normalize_date("69"), "2026");
/// assert_eq!(normalize_date("tomorrow"), "tomorrow");
/// ```
pub fn normalize_date(input: &str) -> String {
    let trimmed = input.trim();

    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return normalize_digits_only(trimmed);
    }

    let tokens: Vec<&str> = trimmed
        .split(|c: char| matches!(c, '-' | '/' | '.' | ',') || c.is_whitespace())
        .filter(|t| !t.is_empty() && !is_weekday(t))
        .collect();

    match parse_parts(&tokens) {
        Some((year, month, day)) => format_ymd(normalize_year(year), month, day),
        None => trimmed.to_string(),
    }
}

fn normalize_digits_only(digits: &str) -> String {
    if digits.len() == 8 {
        if let (Ok(year), Ok(month), Ok(day)) = (
            digits[0..4].parse::<u32>(),
            digits[4..6].parse::<u32>(),
            digits[6..8].parse::<u32>(),
        ) {
            return format_ymd(normalize_year(year), month, day);
        }
    }

    match digits.parse::<u32>() {
        Ok(year) if digits.len() <= 4 => format!("{:04}", normalize_year(year)),
        _ => digits.to_string(),
    }
}

/// Reads (year, month, day) out of separator-split tokens.
fn parse_parts(tokens: &[&str]) -> Option<(u32, u32, u32)> {
    let [first, second, third] = tokens else {
        return None;
    };

    // 2569-01-15
    if first.len() >= 3 && is_number(first) {
        return Some((
            number(first)?,
            month_of(second)?,
            number(third)?,
        ));
    }

    // Jan 15 2026
    if let Some(month) = month_name(first) {
        return Some((number(third)?, month, number(second)?));
    }

    // 15/01/69, 15 Jan 2569
    Some((number(third)?, month_of(second)?, number(first)?))
}

fn format_ymd(year: u32, month: u32, day: u32) -> String {
    match NaiveDate::from_ymd_opt(year as i32, month, day) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        // Not a real calendar date; still report what was read.
        None => format!("{:04}-{:02}-{:02}", year, month, day),
    }
}

fn is_number(token: &str) -> bool {
    token.len() <= 4 && token.bytes().all(|b| b.is_ascii_digit())
}

fn number(token: &str) -> Option<u32> {
    if is_number(token) {
        token.parse().ok()
    } else {
        None
    }
}

/// Numeric month or English month name.
fn month_of(token: &str) -> Option<u32> {
    number(token).or_else(|| month_name(token))
}

fn month_name(token: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = token.to_lowercase();
    if lower.len() < 3 || !lower.is_ascii() {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn is_weekday(token: &str) -> bool {
    const DAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
    let lower = token.to_lowercase();
    lower.len() >= 3 && lower.is_ascii() && DAYS.iter().any(|d| lower.starts_with(d))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_literals() {
        assert_eq!(normalize_year(69), 2026);
        assert_eq!(normalize_year(26), 2026);
        assert_eq!(normalize_year(2569), 2026);
        assert_eq!(normalize_year(2026), 2026);
        assert_eq!(normalize_year(2069), 2026);
    }

    #[test]
    fn test_boundary_49_50() {
        assert_eq!(normalize_year(49), 2049);
        assert_eq!(normalize_year(50), 2007);
    }

    #[test]
    fn test_boundary_99_100() {
        assert_eq!(normalize_year(99), 2056);
        assert_eq!(normalize_year(100), 2057);
        assert_eq!(normalize_year(199), 2156);
        assert_eq!(normalize_year(200), 200);
    }

    #[test]
    fn test_boundary_2049_2050() {
        assert_eq!(normalize_year(2049), 2049);
        assert_eq!(normalize_year(2050), 2007);
    }

    #[test]
    fn test_boundary_2099_2100() {
        assert_eq!(normalize_year(2099), 2056);
        assert_eq!(normalize_year(2100), 2100);
    }

    #[test]
    fn test_boundary_2499_2500() {
        assert_eq!(normalize_year(2499), 2499);
        assert_eq!(normalize_year(2500), 1957);
    }

    #[test]
    fn test_bare_year_strings() {
        assert_eq!(normalize_date("69"), "2026");
        assert_eq!(normalize_date("26"), "2026");
        assert_eq!(normalize_date("2569"), "2026");
        assert_eq!(normalize_date("2026"), "2026");
        assert_eq!(normalize_date(" 2069 "), "2026");
        assert_eq!(normalize_date("5"), "2005");
    }

    #[test]
    fn test_year_first_dates() {
        assert_eq!(normalize_date("2569-01-15"), "2026-01-15");
        assert_eq!(normalize_date("2026/1/5"), "2026-01-05");
        assert_eq!(normalize_date("2069-12-31"), "2026-12-31");
        assert_eq!(normalize_date("25690115"), "2026-01-15");
    }

    #[test]
    fn test_day_first_dates() {
        assert_eq!(normalize_date("15/01/69"), "2026-01-15");
        assert_eq!(normalize_date("15/01/26"), "2026-01-15");
        assert_eq!(normalize_date("15-1-2569"), "2026-01-15");
        assert_eq!(normalize_date("15.01.2026"), "2026-01-15");
    }

    #[test]
    fn test_month_name_dates() {
        assert_eq!(normalize_date("15 Jan 2569"), "2026-01-15");
        assert_eq!(normalize_date("15 January 69"), "2026-01-15");
        assert_eq!(normalize_date("Jan 15, 2026"), "2026-01-15");
        assert_eq!(normalize_date("Mon 15 Jan 2026"), "2026-01-15");
        assert_eq!(normalize_date("3 SEP 2568"), "2025-09-03");
    }

    #[test]
    fn test_impossible_calendar_date_is_still_formatted() {
        assert_eq!(normalize_date("31/02/2569"), "2026-02-31");
    }

    #[test]
    fn test_unreadable_input_is_returned() {
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("  next week "), "next week");
        assert_eq!(normalize_date("15/01"), "15/01");
        assert_eq!(normalize_date("123456789"), "123456789");
        assert_eq!(normalize_date("15 Foo 2569"), "15 Foo 2569");
    }
}
