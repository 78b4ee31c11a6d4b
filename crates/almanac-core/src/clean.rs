//! Missing-value repair for raw bar series.
//!
//! Each numeric column is repaired independently:
//!
//! 1. forward-fill from the most recent valid prior value;
//! 2. leading gaps take the column mean of the values present after step 1;
//! 3. rows still missing a value (only possible when a column has no valid
//!    value at all) are dropped.
//!
//! Dates are never created or reordered.

use serde::Serialize;
use tracing::debug;

use crate::{Bar, BarField, BarSeries, PipelineError, RawBarSeries};

/// Counts of repairs applied by [`clean_with_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub forward_filled: usize,
    pub mean_imputed: usize,
    pub dropped_rows: usize,
}

/// Repair missing values; see the module docs for the policy.
///
/// # Errors
///
/// [`PipelineError::InsufficientData`] when no row survives.
pub fn clean(series: &RawBarSeries) -> Result<BarSeries, PipelineError> {
    clean_with_stats(series).map(|(cleaned, _)| cleaned)
}

pub fn clean_with_stats(series: &RawBarSeries) -> Result<(BarSeries, CleaningStats), PipelineError> {
    let rows = series.bars();
    let mut stats = CleaningStats {
        input_rows: rows.len(),
        ..CleaningStats::default()
    };

    let columns: Vec<(BarField, Vec<Option<f64>>)> = BarField::ALL
        .iter()
        .map(|field| {
            let mut column: Vec<Option<f64>> = rows.iter().map(|bar| bar.value(*field)).collect();
            stats.forward_filled += forward_fill(&mut column);
            stats.mean_imputed += impute_leading(&mut column);
            (*field, column)
        })
        .collect();
    let repaired = |field: BarField, index: usize| {
        columns
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .and_then(|(_, column)| column[index])
    };

    let mut bars = Vec::with_capacity(rows.len());
    for (index, raw) in rows.iter().enumerate() {
        let values = [
            repaired(BarField::Open, index),
            repaired(BarField::High, index),
            repaired(BarField::Low, index),
            repaired(BarField::Close, index),
            repaired(BarField::Volume, index),
        ];
        match values {
            [Some(open), Some(high), Some(low), Some(close), Some(volume)] => {
                bars.push(Bar::new(raw.date, open, high, low, close, volume)?);
            }
            _ => stats.dropped_rows += 1,
        }
    }

    if bars.is_empty() {
        return Err(PipelineError::InsufficientData {
            input_rows: stats.input_rows,
        });
    }

    debug!(
        ticker = %series.ticker(),
        input_rows = stats.input_rows,
        forward_filled = stats.forward_filled,
        mean_imputed = stats.mean_imputed,
        dropped_rows = stats.dropped_rows,
        "cleaned bar series"
    );

    let cleaned = BarSeries::new(series.ticker().clone(), bars)?;
    Ok((cleaned, stats))
}

fn forward_fill(column: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut last = None;
    for slot in column.iter_mut() {
        match slot {
            Some(value) => last = Some(*value),
            None => {
                if let Some(previous) = last {
                    *slot = Some(previous);
                    filled += 1;
                }
            }
        }
    }
    filled
}

fn impute_leading(column: &mut [Option<f64>]) -> usize {
    let present: Vec<f64> = column.iter().flatten().copied().collect();
    if present.is_empty() {
        return 0;
    }
    let mean = present.iter().sum::<f64>() / present.len() as f64;

    let mut imputed = 0;
    for slot in column.iter_mut().filter(|slot| slot.is_none()) {
        *slot = Some(mean);
        imputed += 1;
    }
    imputed
}
