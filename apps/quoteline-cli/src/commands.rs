//! # Command Handlers
//!
//! Each subcommand reads its input, calls into quoteline-core, and writes
//! the result. Logs go to stderr; stdout carries only the result.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::future::Future;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use quoteline_core::pricing::PricedCost;
use quoteline_core::{
    normalize_date, parse_cost, price_cost, price_days, rewrite_with_customer, DayCost,
    ParsedCost, PricingConfig, QuoteSummary, RewriteOutcome,
};

use crate::debounce::Debouncer;

// =============================================================================
// rewrite
// =============================================================================

/// Reads a file, or stdin when the path is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read quotation from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read quotation from {}", path.display()))
    }
}

pub fn rewrite_document(
    input: &Path,
    output: Option<&PathBuf>,
    customer: Option<&str>,
    show_summary: bool,
    config: &PricingConfig,
) -> Result<RewriteOutcome> {
    let text = read_input(input)?;
    let outcome = rewrite_with_customer(&text, customer, config);
    report_outcome(&outcome);

    match output {
        Some(path) => std::fs::write(path, &outcome.text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(outcome.text.as_bytes())?;
            stdout.flush()?;
        }
    }

    if show_summary {
        eprint!("{}", render_summary(&outcome, config));
    }

    Ok(outcome)
}

/// Logs what the caller of a rewrite should know about.
fn report_outcome(outcome: &RewriteOutcome) {
    if outcome.price_lines_rewritten == 0 {
        warn!("No price lines found; the quotation may not be in the expected format");
    }
    info!(
        price_lines = outcome.price_lines_rewritten,
        grand_total = outcome.grand_total.amount(),
        diagnostics = outcome.diagnostics.len(),
        "Quotation priced"
    );
}

/// Human-readable per-day totals for stderr.
pub fn render_summary(outcome: &RewriteOutcome, config: &PricingConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} price line(s) rewritten at {}% margin",
        outcome.price_lines_rewritten,
        config.margin.percentage()
    );
    for (i, total) in outcome.day_totals.iter().enumerate() {
        let _ = writeln!(out, "  day {}: {}", i + 1, total.formatted());
    }
    let _ = writeln!(
        out,
        "  total: {} (≈ {:.2} THB)",
        outcome.grand_total.formatted(),
        config.to_display_currency(outcome.grand_total)
    );
    for diagnostic in &outcome.diagnostics {
        let _ = writeln!(out, "  warning: {}", diagnostic);
    }
    out
}

// =============================================================================
// parse
// =============================================================================

/// JSON shape printed by `quoteline parse`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub cost: ParsedCost,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priced: Option<PricedCost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_expression: Option<String>,
}

pub fn parse_expression(expr: &str, config: Option<&PricingConfig>) -> Result<ParseReport> {
    let cost = parse_cost(expr).with_context(|| format!("Cannot read '{}'", expr.trim()))?;
    let priced = config.map(|c| price_cost(&cost, c));
    let selling_expression = priced.as_ref().map(|p| p.to_selling_cost().to_string());

    Ok(ParseReport {
        cost,
        priced,
        selling_expression,
    })
}

// =============================================================================
// days
// =============================================================================

/// One day as written by the structured extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedDay {
    #[serde(default)]
    pub date: Option<String>,
    pub expression: String,
}

/// Prices a JSON array of `{ "date": ..., "expression": ... }`.
pub fn price_extracted_days(json: &str, config: &PricingConfig) -> Result<QuoteSummary> {
    let extracted: Vec<ExtractedDay> =
        serde_json::from_str(json).context("Day list is not valid JSON")?;

    let days = extracted
        .into_iter()
        .enumerate()
        .map(|(i, day)| {
            let cost = parse_cost(&day.expression)
                .with_context(|| format!("Day {}: cannot read '{}'", i + 1, day.expression))?;
            Ok(DayCost {
                date: day.date,
                cost,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(price_days(&days, config))
}

// =============================================================================
// date
// =============================================================================

pub fn normalize_dates(dates: &[String]) -> Vec<String> {
    dates.iter().map(|d| normalize_date(d)).collect()
}

// =============================================================================
// watch
// =============================================================================

/// Timing for [`watch_file`].
#[derive(Debug, Clone, Copy)]
pub struct WatchTiming {
    pub debounce: Duration,
    pub poll_interval: Duration,
}

/// Re-prices `path` whenever its contents change and stay unchanged for
/// the debounce period. Runs until `shutdown` completes.
///
/// Returns how many recomputes ran.
pub async fn watch_file<S, F>(
    path: &Path,
    config: &PricingConfig,
    customer: Option<&str>,
    timing: WatchTiming,
    shutdown: S,
    mut on_recompute: F,
) -> usize
where
    S: Future<Output = ()>,
    F: FnMut(&RewriteOutcome),
{
    let (mut debouncer, mut fired) = Debouncer::new();
    let mut ticker = tokio::time::interval(timing.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_seen: Option<String> = None;
    let mut read_failing = false;
    let mut recomputes = 0;

    tokio::pin!(shutdown);
    info!(path = %path.display(), debounce_ms = timing.debounce.as_millis() as u64, "Watching quotation");

    loop {
        // On a shared instant the poll runs first, so an edit it finds
        // re-arms the timer before a fire for older contents is taken.
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                debouncer.cancel();
                info!(recomputes, "Watch stopped");
                break;
            }
            _ = ticker.tick() => {
                match std::fs::read_to_string(path) {
                    Ok(text) => {
                        read_failing = false;
                        if last_seen.as_deref() != Some(text.as_str()) {
                            debug!("Quotation changed");
                            last_seen = Some(text);
                            debouncer.arm(timing.debounce);
                        }
                    }
                    Err(e) => {
                        if !read_failing {
                            warn!(path = %path.display(), error = %e, "Cannot read watched file");
                        }
                        read_failing = true;
                    }
                }
            }
            Some(()) = fired.recv() => {
                if let Some(text) = &last_seen {
                    let outcome = rewrite_with_customer(text, customer, config);
                    report_outcome(&outcome);
                    on_recompute(&outcome);
                    recomputes += 1;
                }
            }
        }
    }

    recomputes
}

// =============================================================================
// Unit Tests
// =============================================================================
