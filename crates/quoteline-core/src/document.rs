//! # Quotation Document Rewriter
//!
//! Recalculates the prices inside an operator's multi-day quotation while
//! leaving every other byte of the document alone.
//!
//! ## Document Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Mr. Tanaka                          ← optional customer name          │
//! │                                                                         │
//! │  Date: 15 Jan 2569                   ← DateHeader                      │
//! │  Service: Charter                    ← Descriptor                      │
//! │  Pax: 4                                                                 │
//! │  Car: Alphard                                                           │
//! │  Route: Bangkok -> Pattaya           ← Route                           │
//! │  75000+2000*2(Baby seat)             ← PriceLine  ★ rewritten ★        │
//! │                                                                         │
//! │  75000+79000 = 154000 in total       ← TotalLine  ★ rewritten ★        │
//! │                                                                         │
//! │  WAITING TIME RULES                  ← SectionMarker                   │
//! │  - 1000 per extra hour               ← Rules      (never touched)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Output has exactly as many lines as input, with the same line endings.
//! - Only price lines and the total line change, and only their numbers.
//! - Nothing at or after the `WAITING TIME RULES` marker is ever read as a
//!   price, even when it starts with digits.
//! - Rewriting never fails. A price-positioned line that does not parse is
//!   emitted unchanged and recorded as a [`Diagnostic`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ts_rs::TS;

use crate::expression::parse_cost;
use crate::money::Yen;
use crate::pricing::price_cost;
use crate::types::{Diagnostic, DiagnosticKind, PricingConfig};
use crate::{MIN_PRICE_DIGITS, RULES_MARKER};

/// Labels that may directly precede a price line (lowercase).
const PRICE_PRECEDING_LABELS: [&str; 7] = [
    "route:", "note:", "car:", "pax:", "luggage:", "service:", "date",
];

const TOTAL_PHRASE: &str = "in total";

// =============================================================================
// Line Roles
// =============================================================================

/// Kind of a `Label: value` descriptor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    Service,
    Pax,
    Luggage,
    Car,
    Note,
}

/// What a single line of a quotation document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Blank,
    DateHeader,
    Descriptor(DescriptorKind),
    Route,
    PriceLine,
    TotalLine,
    /// The `WAITING TIME RULES` line itself.
    SectionMarker,
    /// Anything after the marker.
    Rules,
    Freeform,
}

/// Classifies one line from its own text and the line right above it.
///
/// This is the only place that knows the previous-line heuristic; the
/// rewriter just acts on the role it gets back.
///
/// ## Price Line Rule
/// ```text
/// (a) trimmed line starts with ≥4 digits AND (has '+' OR has '(' OR is all digits)
/// (b) trimmed previous line starts with route:/note:/car:/pax:/luggage:/service:/date
///     (case-insensitive)
/// (c) neither line starts with '-'
/// ```
///
/// ## Example
/// ```rust
/// use quoteline_core::document::{classify, LineRole};
///
/// assert_eq!(classify(Some("Route: A -> B"), "75000", false), LineRole::PriceLine);
/// assert_eq!(classify(Some(""), "75000", false), LineRole::Freeform);
/// assert_eq!(classify(Some("Route: A -> B"), "75000", true), LineRole::Rules);
/// ```
pub fn classify(prev: Option<&str>, line: &str, in_rules_section: bool) -> LineRole {
    if contains_ignore_case(line, RULES_MARKER) {
        return LineRole::SectionMarker;
    }
    if in_rules_section {
        return LineRole::Rules;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineRole::Blank;
    }

    if is_total_line(trimmed) {
        return LineRole::TotalLine;
    }

    if is_price_line(prev, trimmed) {
        return LineRole::PriceLine;
    }

    let lower = trimmed.to_lowercase();
    if lower.starts_with("route:") {
        LineRole::Route
    } else if lower.starts_with("service:") {
        LineRole::Descriptor(DescriptorKind::Service)
    } else if lower.starts_with("pax:") {
        LineRole::Descriptor(DescriptorKind::Pax)
    } else if lower.starts_with("luggage:") {
        LineRole::Descriptor(DescriptorKind::Luggage)
    } else if lower.starts_with("car:") {
        LineRole::Descriptor(DescriptorKind::Car)
    } else if lower.starts_with("note:") {
        LineRole::Descriptor(DescriptorKind::Note)
    } else if lower.starts_with("date") || is_day_heading(&lower) {
        LineRole::DateHeader
    } else {
        LineRole::Freeform
    }
}

fn is_price_line(prev: Option<&str>, trimmed: &str) -> bool {
    let leading_digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    if leading_digits < MIN_PRICE_DIGITS {
        return false;
    }
    let all_digits = leading_digits == trimmed.len();
    if !(all_digits || trimmed.contains('+') || trimmed.contains('(')) {
        return false;
    }

    let Some(prev) = prev.map(str::trim) else {
        return false;
    };
    if prev.starts_with('-') || trimmed.starts_with('-') {
        return false;
    }

    let prev_lower = prev.to_lowercase();
    PRICE_PRECEDING_LABELS
        .iter()
        .any(|label| prev_lower.starts_with(label))
}

fn is_total_line(trimmed: &str) -> bool {
    trimmed.contains('=') && contains_ignore_case(trimmed, TOTAL_PHRASE)
}

/// `Day 1`, `day 2 - 16/01/69`, ...
fn is_day_heading(lower: &str) -> bool {
    lower
        .strip_prefix("day")
        .map(|rest| rest.trim_start().starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(false)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    find_ignore_case(haystack, needle).is_some()
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case.
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

// =============================================================================
// Document Model
// =============================================================================

/// One physical line: its text and the break that ended it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub content: &'a str,
    /// `"\n"`, `"\r\n"`, or `""` for a final line without a break.
    pub ending: &'a str,
}

/// A quotation document split into classified lines.
#[derive(Debug, Clone)]
pub struct QuotationDocument<'a> {
    lines: Vec<Line<'a>>,
    roles: Vec<LineRole>,
    rules_start: Option<usize>,
}

impl<'a> QuotationDocument<'a> {
    /// Splits and classifies a document. Never fails.
    pub fn parse(text: &'a str) -> Self {
        let lines: Vec<Line<'a>> = text
            .split_inclusive('\n')
            .map(|raw| {
                let content = raw
                    .strip_suffix("\r\n")
                    .or_else(|| raw.strip_suffix('\n'))
                    .unwrap_or(raw);
                Line {
                    content,
                    ending: &raw[content.len()..],
                }
            })
            .collect();

        let rules_start = lines
            .iter()
            .position(|line| contains_ignore_case(line.content, RULES_MARKER));

        let roles = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let prev = i.checked_sub(1).map(|p| lines[p].content);
                let in_rules = rules_start.is_some_and(|start| i >= start);
                classify(prev, line.content, in_rules)
            })
            .collect();

        QuotationDocument {
            lines,
            roles,
            rules_start,
        }
    }

    pub fn lines(&self) -> &[Line<'a>] {
        &self.lines
    }

    pub fn roles(&self) -> &[LineRole] {
        &self.roles
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Index of the `WAITING TIME RULES` line, if present.
    pub fn rules_start(&self) -> Option<usize> {
        self.rules_start
    }

    /// The leading customer-name line: the first line, when it is plain text.
    pub fn customer_name(&self) -> Option<&'a str> {
        match (self.lines.first(), self.roles.first()) {
            (Some(line), Some(LineRole::Freeform)) => Some(line.content.trim()),
            _ => None,
        }
    }

    /// Read-only per-day view of everything before the rules section.
    ///
    /// A day starts at a date header (or at the first descriptor when there
    /// is none) and is closed by its price line.
    pub fn days(&self) -> Vec<DayBlock> {
        let mut days = Vec::new();
        let mut current: Option<DayBlock> = None;

        for (i, (line, role)) in self.lines.iter().zip(&self.roles).enumerate() {
            let text = line.content.trim();
            match role {
                LineRole::DateHeader => {
                    if let Some(done) = current.take() {
                        days.push(done);
                    }
                    let mut block = DayBlock::starting_at(i + 1);
                    block.date_header = Some(text.to_string());
                    current = Some(block);
                }
                LineRole::Descriptor(kind) => {
                    current
                        .get_or_insert_with(|| DayBlock::starting_at(i + 1))
                        .descriptors
                        .push((*kind, label_value(text).to_string()));
                }
                LineRole::Route => {
                    current
                        .get_or_insert_with(|| DayBlock::starting_at(i + 1))
                        .route = Some(label_value(text).to_string());
                }
                LineRole::PriceLine => {
                    let mut block = current
                        .take()
                        .unwrap_or_else(|| DayBlock::starting_at(i + 1));
                    block.price_expression = Some(text.to_string());
                    days.push(block);
                }
                LineRole::SectionMarker | LineRole::Rules => break,
                _ => {}
            }
        }

        if let Some(done) = current {
            days.push(done);
        }
        days
    }
}

/// The lines that make up one day of a quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayBlock {
    /// 1-based line where the day starts.
    pub start_line: usize,
    pub date_header: Option<String>,
    pub descriptors: Vec<(DescriptorKind, String)>,
    pub route: Option<String>,
    pub price_expression: Option<String>,
}

impl DayBlock {
    fn starting_at(start_line: usize) -> Self {
        DayBlock {
            start_line,
            date_header: None,
            descriptors: Vec::new(),
            route: None,
            price_expression: None,
        }
    }
}

/// `"Car: Alphard"` → `"Alphard"`.
fn label_value(text: &str) -> &str {
    text.split_once(':').map(|(_, v)| v.trim()).unwrap_or(text)
}

// =============================================================================
// Rewrite
// =============================================================================

/// Result of rewriting a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RewriteOutcome {
    /// The rewritten document.
    pub text: String,
    /// Zero here usually means the document is not in the expected format.
    pub price_lines_rewritten: usize,
    /// Selling total per rewritten price line, in document order.
    pub day_totals: Vec<Yen>,
    /// Sum of `day_totals`.
    pub grand_total: Yen,
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrites every price line and the total line at selling prices.
///
/// ## Example
/// ```rust
/// use quoteline_core::document::rewrite;
/// use quoteline_core::PricingConfig;
///
/// let config = PricingConfig::new(30.0, 0.23).unwrap();
/// let doc = "Route: A -> B\n79000+2000*2(Baby seat)\n";
///
/// let outcome = rewrite(doc, &config);
/// assert_eq!(outcome.text, "Route: A -> B\n110000+2800*2(Baby seat)\n");
/// assert_eq!(outcome.day_totals[0].amount(), 115600);
/// ```
pub fn rewrite(document: &str, config: &PricingConfig) -> RewriteOutcome {
    let doc = QuotationDocument::parse(document);
    let mut out = String::with_capacity(document.len() + 64);
    let mut day_totals: Vec<Yen> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut price_lines_rewritten = 0;

    for (i, (line, role)) in doc.lines().iter().zip(doc.roles()).enumerate() {
        let line_no = i + 1;
        let rewritten = match role {
            LineRole::PriceLine => {
                match rewrite_price_line(line.content, config, line_no, &mut diagnostics) {
                    Some((text, day_total)) => {
                        price_lines_rewritten += 1;
                        day_totals.push(day_total);
                        Some(text)
                    }
                    None => None,
                }
            }
            LineRole::TotalLine => {
                rewrite_total_line(line.content, &day_totals, config, line_no, &mut diagnostics)
            }
            _ => None,
        };

        out.push_str(rewritten.as_deref().unwrap_or(line.content));
        out.push_str(line.ending);
    }

    let grand_total: Yen = day_totals.iter().sum();
    debug!(
        lines = doc.line_count(),
        price_lines = price_lines_rewritten,
        grand_total = grand_total.amount(),
        "Quotation rewritten"
    );

    RewriteOutcome {
        text: out,
        price_lines_rewritten,
        day_totals,
        grand_total,
        diagnostics,
    }
}

/// Like [`rewrite`], then puts the customer name on top when the document
/// does not already start with it.
pub fn rewrite_with_customer(
    document: &str,
    customer: Option<&str>,
    config: &PricingConfig,
) -> RewriteOutcome {
    let mut outcome = rewrite(document, config);

    if let Some(name) = customer.map(str::trim).filter(|n| !n.is_empty()) {
        let first_line = document.lines().find(|l| !l.trim().is_empty());
        if first_line.map(str::trim) != Some(name) {
            let eol = if document.split('\n').next().is_some_and(|l| l.ends_with('\r')) {
                "\r\n"
            } else {
                "\n"
            };
            outcome.text = format!("{}{}{}{}", name, eol, eol, outcome.text);
        }
    }

    outcome
}

/// Returns the new line text and the day's selling total, or `None` to keep
/// the line as written.
fn rewrite_price_line(
    content: &str,
    config: &PricingConfig,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<(String, Yen)> {
    let (lead, expr, trail) = split_padding(content);

    let cost = match parse_cost(expr) {
        Ok(cost) => cost,
        Err(err) => {
            warn!(line = line_no, error = %err, "Leaving unparseable price line unchanged");
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::MalformedExpression,
                    format!("'{}': {}", expr, err),
                )
                .at_line(line_no),
            );
            return None;
        }
    };

    diagnostics.extend(cost.diagnostics.iter().cloned().map(|d| d.at_line(line_no)));

    let priced = price_cost(&cost, config);
    let selling = priced.to_selling_cost().to_string();
    debug!(line = line_no, from = expr, to = %selling, "Price line rewritten");

    Some((format!("{}{}{}", lead, selling, trail), priced.day_total))
}

/// Rebuilds `t1+...+tn = SUM in total`, keeping all non-numeric text.
fn rewrite_total_line(
    content: &str,
    day_totals: &[Yen],
    config: &PricingConfig,
    line_no: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let eq = content.find('=')?;
    let (lhs, rhs_with_eq) = content.split_at(eq);
    let rhs = &rhs_with_eq[1..];

    let terms: Vec<Yen> = if day_totals.is_empty() {
        let Some(costs) = numeric_terms(lhs) else {
            warn!(line = line_no, "Total line has no readable terms; left unchanged");
            return None;
        };
        warn!(line = line_no, "No day prices found; recomputing total from its own terms");
        diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::TotalFallback,
                "no day prices found; total recomputed from its own terms",
            )
            .at_line(line_no),
        );
        costs.into_iter().map(|c| config.sell_base(c)).collect()
    } else {
        day_totals.to_vec()
    };

    let sum: Yen = terms.iter().sum();
    let joined = terms
        .iter()
        .map(Yen::to_string)
        .collect::<Vec<_>>()
        .join("+");

    // Only the sum right before '=' is replaced; a label like
    // "Total (2 days):" stays as written.
    let new_lhs = match sum_terms_before(lhs) {
        Some((start, end)) => format!("{}{}{}", &lhs[..start], joined, &lhs[end..]),
        None => lhs.to_string(),
    };

    // Digits after the phrase ("in total for 4 pax") are not part of the sum.
    let phrase_at = find_ignore_case(rhs, TOTAL_PHRASE).unwrap_or(rhs.len());
    let (amount, suffix) = rhs.split_at(phrase_at);
    let new_amount = match first_amount(amount) {
        Some((start, end)) => format!("{}{}{}", &amount[..start], sum, &amount[end..]),
        None => format!(" {} {}", sum, amount.trim_start()),
    };

    Some(format!("{}={}{}", new_lhs, new_amount, suffix))
}

/// Splits `"  text  "` into (`"  "`, `"text"`, `"  "`).
fn split_padding(s: &str) -> (&str, &str, &str) {
    let start = s.len() - s.trim_start().len();
    let end = s.trim_end().len().max(start);
    (&s[..start], &s[start..end], &s[end..])
}

/// Start of the `75,000` style amount that ends at byte `end`.
fn amount_start(bytes: &[u8], end: usize) -> Option<usize> {
    if end == 0 || !bytes[end - 1].is_ascii_digit() {
        return None;
    }
    let mut start = end;
    while start > 0 && (bytes[start - 1].is_ascii_digit() || bytes[start - 1] == b',') {
        start -= 1;
    }
    while bytes[start] == b',' {
        start += 1;
    }
    Some(start)
}

/// Byte range of the `a + b + c` run that ends `lhs` (trailing spaces aside).
///
/// `None` when `lhs` does not end in an amount, or when a `+` in the run is
/// not preceded by one (`75000 + abc + 1`).
fn sum_terms_before(lhs: &str) -> Option<(usize, usize)> {
    let bytes = lhs.as_bytes();
    let end = lhs.trim_end().len();
    let mut start = amount_start(bytes, end)?;

    loop {
        let mut at = start;
        while at > 0 && matches!(bytes[at - 1], b' ' | b'\t') {
            at -= 1;
        }
        if at == 0 || bytes[at - 1] != b'+' {
            return Some((start, end));
        }
        at -= 1;
        while at > 0 && matches!(bytes[at - 1], b' ' | b'\t') {
            at -= 1;
        }
        start = amount_start(bytes, at)?;
    }
}

/// Byte range of the first `154,000` style amount in `segment`.
fn first_amount(segment: &str) -> Option<(usize, usize)> {
    let start = segment.find(|c: char| c.is_ascii_digit())?;
    let bytes = segment.as_bytes();
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b',') {
        end += 1;
    }
    while bytes[end - 1] == b',' {
        end -= 1;
    }
    Some((start, end))
}

/// Reads the `75,000 + 116000` terms ending the left side of a total line.
fn numeric_terms(lhs: &str) -> Option<Vec<Yen>> {
    let (start, end) = sum_terms_before(lhs)?;
    lhs[start..end]
        .split('+')
        .map(|term| {
            let digits: String = term.trim().chars().filter(|c| *c != ',').collect();
            digits.parse::<u64>().ok().map(Yen::new)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
