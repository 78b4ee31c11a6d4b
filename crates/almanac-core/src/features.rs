//! Rolling, return, and scaled-volume features over clean bars.
//!
//! | Column | Definition | Undefined for |
//! |--------|------------|---------------|
//! | `ma_5` | trailing 5-bar mean close | first 4 rows |
//! | `ma_10` | trailing 10-bar mean close | first 9 rows |
//! | `pct_change` | `(close[i] - close[i-1]) / close[i-1]` | row 0, zero prior close |
//! | `volume_scaled` | `(volume - mean) / population stdev` | never (0 when stdev is 0) |
//!
//! Undefined moving averages take the series' mean close; undefined percent
//! changes take the mean of the defined percent changes (0 when none are).

use ndarray::Array2;
use serde::Serialize;
use time::Date;
use tracing::debug;

use crate::domain::ensure_ascending;
use crate::{Bar, BarSeries, Dated, PipelineError, Ticker, ValidationError};

pub const SHORT_WINDOW: usize = 5;
pub const LONG_WINDOW: usize = 10;

/// Column order of [`FeatureMatrix::to_array`].
pub const FEATURE_COLUMNS: [&str; 9] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "ma_5",
    "ma_10",
    "pct_change",
    "volume_scaled",
];

/// A bar plus its derived features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub bar: Bar,
    pub ma_5: f64,
    pub ma_10: f64,
    pub pct_change: f64,
    pub volume_scaled: f64,
}

impl FeatureRow {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub const fn values(&self) -> [f64; 9] {
        [
            self.bar.open,
            self.bar.high,
            self.bar.low,
            self.bar.close,
            self.bar.volume,
            self.ma_5,
            self.ma_10,
            self.pct_change,
            self.volume_scaled,
        ]
    }
}

impl Dated for FeatureRow {
    fn date(&self) -> Date {
        self.bar.date
    }
}

/// Feature rows for one ticker, in bar order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    ticker: Ticker,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(ticker: Ticker, rows: Vec<FeatureRow>) -> Result<Self, ValidationError> {
        ensure_ascending(&rows)?;
        Ok(Self { ticker, rows })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dense `rows × 9` matrix for scorers.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows.len(), FEATURE_COLUMNS.len()), |(row, column)| {
            self.rows[row].values()[column]
        })
    }

    /// First `(row, column)` holding a NaN or infinity.
    pub fn first_non_finite(&self) -> Option<(usize, &'static str)> {
        self.rows.iter().enumerate().find_map(|(index, row)| {
            row.values()
                .iter()
                .position(|value| !value.is_finite())
                .map(|column| (index, FEATURE_COLUMNS[column]))
        })
    }
}

/// Derive features for every bar of `series`.
///
/// # Errors
///
/// - [`PipelineError::EmptySeries`] when `series` has no bars.
/// - [`PipelineError::UnscoredData`] when a derived value is not finite.
pub fn engineer(series: &BarSeries) -> Result<FeatureMatrix, PipelineError> {
    let bars = series.bars();
    if bars.is_empty() {
        return Err(PipelineError::EmptySeries);
    }

    let closes: Vec<f64> = series.closes().collect();
    let mean_close = mean(&closes);

    let ma_5 = trailing_mean(&closes, SHORT_WINDOW);
    let ma_10 = trailing_mean(&closes, LONG_WINDOW);

    let pct_change: Vec<Option<f64>> = std::iter::once(None)
        .chain(closes.windows(2).map(|pair| {
            let change = (pair[1] - pair[0]) / pair[0];
            change.is_finite().then_some(change)
        }))
        .collect();
    let defined_changes: Vec<f64> = pct_change.iter().flatten().copied().collect();
    let mean_change = if defined_changes.is_empty() {
        0.0
    } else {
        mean(&defined_changes)
    };

    let volumes: Vec<f64> = bars.iter().map(|bar| bar.volume).collect();
    let volume_scaled = standardize(&volumes);

    let rows: Vec<FeatureRow> = bars
        .iter()
        .enumerate()
        .map(|(index, bar)| FeatureRow {
            bar: *bar,
            ma_5: ma_5[index].unwrap_or(mean_close),
            ma_10: ma_10[index].unwrap_or(mean_close),
            pct_change: pct_change[index].unwrap_or(mean_change),
            volume_scaled: volume_scaled[index],
        })
        .collect();

    debug!(
        ticker = %series.ticker(),
        rows = rows.len(),
        mean_close,
        mean_change,
        "engineered features"
    );

    let matrix = FeatureMatrix::new(series.ticker().clone(), rows)?;
    if let Some((row, column)) = matrix.first_non_finite() {
        return Err(PipelineError::UnscoredData { row, column });
    }
    Ok(matrix)
}

// Terms are divided before summing so closes near `f64::MAX` cannot overflow.
fn mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    values.iter().map(|value| value / n).sum()
}

fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let width = window as f64;
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            sum += value / width;
            if index >= window {
                sum -= values[index - window] / width;
            }
            (index + 1 >= window).then_some(sum)
        })
        .collect()
}

/// Population z-scores; all zero when the spread is zero.
fn standardize(values: &[f64]) -> Vec<f64> {
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    let sigma = variance.sqrt();
    if sigma == 0.0 || !sigma.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mu) / sigma).collect()
}
