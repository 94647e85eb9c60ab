//! # quoteline
//!
//! Command-line caller for the quotation pricing engine.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  quoteline rewrite quote.txt --margin 37     cost → selling quotation   │
//! │  quoteline parse "79000+2000*2(Baby seat)"   expression → JSON          │
//! │  quoteline days days.json --margin 37        extractor days → JSON      │
//! │  quoteline date 15/01/69 2569-01-16          → Gregorian YYYY-MM-DD     │
//! │  quoteline watch quote.txt --margin 37       re-price on every save     │
//! │  quoteline config [--init]                   show / create config file  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`.

mod commands;
mod config;
mod debounce;
mod error;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use quoteline_core::validation::parse_margin_percent;

use crate::commands::WatchTiming;
use crate::config::{Overrides, QuotelineConfig};

// =============================================================================
// Command Line
// =============================================================================

#[derive(Parser)]
#[command(name = "quoteline")]
#[command(version)]
#[command(about = "Turn a car operator's cost quotation into a customer selling-price quotation")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Pricing flags shared by every command that prices something.
#[derive(Args, Debug, Clone, Default)]
struct PricingArgs {
    /// Margin over cost in percent, e.g. 37 or 37%
    #[arg(long, short = 'm', value_parser = parse_margin)]
    margin: Option<f64>,

    /// THB per JPY for the display total
    #[arg(long)]
    exchange_rate: Option<f64>,

    /// Round day base prices to the next 1,000
    #[arg(long)]
    fixed_thousand: bool,
}

impl PricingArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            margin_percent: self.margin,
            exchange_rate: self.exchange_rate,
            fixed_thousand: self.fixed_thousand,
            debounce_ms: None,
        }
    }
}

fn parse_margin(raw: &str) -> Result<f64, String> {
    parse_margin_percent(raw).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite a quotation document at selling prices
    Rewrite {
        /// Quotation file, or - for stdin
        input: PathBuf,

        #[command(flatten)]
        pricing: PricingArgs,

        /// Put this customer name on top if the document lacks it
        #[arg(long)]
        customer: Option<String>,

        /// Print per-day totals to stderr
        #[arg(long)]
        summary: bool,

        /// Write here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Parse one cost expression and print it as JSON (priced when a margin is set)
    Parse {
        expression: String,

        #[command(flatten)]
        pricing: PricingArgs,
    },

    /// Price a JSON list of extracted days
    Days {
        /// JSON file of [{"date": ..., "expression": ...}], or - for stdin
        input: PathBuf,

        #[command(flatten)]
        pricing: PricingArgs,
    },

    /// Normalize dates to Gregorian YYYY-MM-DD
    Date {
        #[arg(required = true)]
        dates: Vec<String>,
    },

    /// Re-price a quotation every time it is saved
    Watch {
        file: PathBuf,

        #[command(flatten)]
        pricing: PricingArgs,

        #[arg(long)]
        customer: Option<String>,

        /// Quiet period before recomputing (milliseconds)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Show the effective configuration
    Config {
        /// Write a starter config file if none exists
        #[arg(long)]
        init: bool,
    },
}

// =============================================================================
// Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config;

    match cli.command {
        Commands::Rewrite {
            input,
            pricing,
            customer,
            summary,
            output,
        } => {
            let config = load_config(config_path, &pricing.overrides())?;
            let pricing = config.pricing_config()?;
            commands::rewrite_document(
                &input,
                output.as_ref(),
                customer.as_deref(),
                summary,
                &pricing,
            )?;
        }

        Commands::Parse {
            expression,
            pricing,
        } => {
            let config = load_config(config_path, &pricing.overrides())?;
            // Pricing is optional here: without a margin, just show the parse.
            let pricing = match config.pricing.margin_percent {
                Some(_) => Some(config.pricing_config()?),
                None => None,
            };
            let report = commands::parse_expression(&expression, pricing.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Days { input, pricing } => {
            let config = load_config(config_path, &pricing.overrides())?;
            let pricing = config.pricing_config()?;
            let json = commands::read_input(&input)?;
            let summary = commands::price_extracted_days(&json, &pricing)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Date { dates } => {
            for normalized in commands::normalize_dates(&dates) {
                println!("{}", normalized);
            }
        }

        Commands::Watch {
            file,
            pricing,
            customer,
            debounce_ms,
        } => {
            let overrides = Overrides {
                debounce_ms,
                ..pricing.overrides()
            };
            let config = load_config(config_path, &overrides)?;
            let pricing = config.pricing_config()?;
            let timing = WatchTiming {
                debounce: config.debounce(),
                poll_interval: config.poll_interval(),
            };

            commands::watch_file(
                &file,
                &pricing,
                customer.as_deref(),
                timing,
                shutdown_signal(),
                |outcome| {
                    println!("{}", outcome.text);
                    eprint!("{}", commands::render_summary(outcome, &pricing));
                },
            )
            .await;
        }

        Commands::Config { init } => {
            if init {
                if QuotelineConfig::exists_at(config_path.as_deref()) {
                    warn!("Config file already exists; leaving it untouched");
                } else {
                    let path = QuotelineConfig::default().save(config_path.clone())?;
                    info!(path = %path.display(), "Starter config written; set pricing.margin_percent");
                }
            }
            let config = QuotelineConfig::load(config_path)?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>, overrides: &Overrides) -> Result<QuotelineConfig> {
    let mut config = QuotelineConfig::load(path).context("Failed to load configuration")?;
    config.apply_overrides(overrides);
    Ok(config)
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the `info` default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Waits for Ctrl+C (or SIGTERM on unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_margin_flag_accepts_percent_sign() {
        let cli = Cli::try_parse_from(["quoteline", "rewrite", "q.txt", "--margin", "37%"]).unwrap();
        match cli.command {
            Commands::Rewrite { pricing, .. } => assert_eq!(pricing.margin, Some(37.0)),
            _ => panic!("expected rewrite"),
        }
    }

    #[test]
    fn test_margin_flag_rejects_words() {
        assert!(Cli::try_parse_from(["quoteline", "parse", "75000", "-m", "lots"]).is_err());
    }

    #[test]
    fn test_date_requires_an_argument() {
        assert!(Cli::try_parse_from(["quoteline", "date"]).is_err());
    }
}
