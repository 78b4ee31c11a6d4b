//! CLI argument definitions for almanac.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `detect` | Flag anomalous trading days per ticker |
//! | `calendar` | Compare anomalies inside and outside a calendar period |
//! | `evaluate` | Score predicted labels against ground truth |
//! | `grid` | Print the effective hyperparameter grid |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings and errors as failures |
//! | `--config` | none | YAML pipeline config |
//! | `--data-dir` | none | Read `<TICKER>.json` bar files instead of synthetic bars |
//! | `--seed` | config | Scorer and synthetic source seed |
//! | `-v` | warn | Raise log verbosity (`-v` info, `-vv` debug) |
//!
//! # Examples
//!
//! ```bash
//! almanac detect AAPL MSFT --start 2020-01-01 --end 2020-12-31 --pretty
//! almanac calendar AAPL --start 2015-01-01 --end 2020-12-31 --effect january
//! almanac evaluate --truth truth.json --predicted predicted.json
//! ```

use std::path::PathBuf;

use almanac_core::CalendarEffect;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Calendar-effect anomaly detection for daily OHLCV bars
#[derive(Debug, Parser)]
#[command(
    name = "almanac",
    author,
    version,
    about = "Calendar-effect anomaly detection for daily OHLCV bars"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 6).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// YAML pipeline config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding `<TICKER>.json` raw bar files.
    ///
    /// Without it, bars come from the deterministic synthetic source.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Seed overriding the config file.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Increase log verbosity on stderr.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the standard pipeline for each ticker.
    Detect(DetectArgs),
    /// Run the calendar-effect pipeline for each ticker.
    Calendar(CalendarArgs),
    /// Compute precision, recall and F1 for two label files.
    Evaluate(EvaluateArgs),
    /// Print the hyperparameter grid used by `--select`.
    Grid,
}

#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Tickers to analyze.
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,

    /// First day of the window (YYYY-MM-DD).
    #[arg(long)]
    pub start: String,

    /// Last day of the window (YYYY-MM-DD).
    #[arg(long)]
    pub end: String,

    /// Grid-search scorer hyperparameters before detecting.
    #[arg(long, default_value_t = false)]
    pub select: bool,

    /// Estimator count overriding the config file.
    #[arg(long)]
    pub estimators: Option<usize>,

    /// Contamination fraction overriding the config file.
    #[arg(long)]
    pub contamination: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CalendarArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Calendar effect splitting the window into cohorts.
    #[arg(long, value_enum)]
    pub effect: EffectArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EffectArg {
    /// Bars in January versus the rest of the year.
    January,
    /// Bars on Saturday or Sunday versus weekdays.
    Weekend,
}

impl From<EffectArg> for CalendarEffect {
    fn from(value: EffectArg) -> Self {
        match value {
            EffectArg::January => Self::January,
            EffectArg::Weekend => Self::Weekend,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct EvaluateArgs {
    /// JSON array of true labels (`"normal"` / `"anomalous"`).
    #[arg(long)]
    pub truth: PathBuf,

    /// JSON array of predicted labels.
    #[arg(long)]
    pub predicted: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detect_with_overrides() {
        let cli = Cli::try_parse_from([
            "almanac", "detect", "AAPL", "MSFT", "--start", "2020-01-01", "--end", "2020-12-31",
            "--select", "--estimators", "50", "-vv",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.window.tickers, vec!["AAPL", "MSFT"]);
        assert!(args.window.select);
        assert_eq!(args.window.estimators, Some(50));
    }

    #[test]
    fn calendar_requires_an_effect() {
        assert!(Cli::try_parse_from([
            "almanac", "calendar", "AAPL", "--start", "2020-01-01", "--end", "2020-12-31",
        ])
        .is_err());
    }

    #[test]
    fn detect_requires_a_ticker() {
        assert!(
            Cli::try_parse_from(["almanac", "detect", "--start", "2020-01-01", "--end", "2020-01-31"])
                .is_err()
        );
    }
}
