use serde::{Deserialize, Serialize};
use time::Date;

use super::date::{format_date, iso_date};
use crate::{Ticker, ValidationError};

/// Anything placed on the trading calendar by a single date.
pub trait Dated {
    fn date(&self) -> Date;
}

/// Numeric OHLCV columns, in the order they appear on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarField {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::High,
        Self::Low,
        Self::Close,
        Self::Volume,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }
}

/// Bar as delivered by a quote source; any numeric field may be missing.
///
/// A non-finite value is treated the same as an absent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl RawBar {
    pub fn new(
        date: Date,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: Option<f64>,
        volume: Option<f64>,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Value of `field`, or `None` when absent or non-finite.
    pub fn value(&self, field: BarField) -> Option<f64> {
        let value = match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn is_complete(&self) -> bool {
        BarField::ALL.iter().all(|field| self.value(*field).is_some())
    }
}

impl Dated for RawBar {
    fn date(&self) -> Date {
        self.date
    }
}

impl From<&Bar> for RawBar {
    fn from(bar: &Bar) -> Self {
        Self::new(
            bar.date,
            Some(bar.open),
            Some(bar.high),
            Some(bar.low),
            Some(bar.close),
            Some(bar.volume),
        )
    }
}

/// Daily OHLCV bar with every numeric field present and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        let bar = Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        };
        for field in BarField::ALL {
            if !bar.value(field).is_finite() {
                return Err(ValidationError::NonFiniteValue {
                    field: field.as_str(),
                });
            }
        }
        Ok(bar)
    }

    pub const fn value(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
            BarField::Volume => self.volume,
        }
    }
}

impl Dated for Bar {
    fn date(&self) -> Date {
        self.date
    }
}

/// Raw bars for one ticker, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawBarSeries {
    ticker: Ticker,
    bars: Vec<RawBar>,
}

impl RawBarSeries {
    pub fn new(ticker: Ticker, bars: Vec<RawBar>) -> Result<Self, ValidationError> {
        ensure_ascending(&bars)?;
        Ok(Self { ticker, bars })
    }

    /// Sort by date and keep the last bar for a repeated date.
    pub fn from_unordered(ticker: Ticker, mut bars: Vec<RawBar>) -> Self {
        bars.sort_by_key(|bar| bar.date);
        let mut deduped: Vec<RawBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            ticker,
            bars: deduped,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[RawBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn into_parts(self) -> (Ticker, Vec<RawBar>) {
        (self.ticker, self.bars)
    }
}

impl From<&BarSeries> for RawBarSeries {
    fn from(series: &BarSeries) -> Self {
        Self {
            ticker: series.ticker.clone(),
            bars: series.bars.iter().map(RawBar::from).collect(),
        }
    }
}

/// Clean bars for one ticker, strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    ticker: Ticker,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(ticker: Ticker, bars: Vec<Bar>) -> Result<Self, ValidationError> {
        ensure_ascending(&bars)?;
        Ok(Self { ticker, bars })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.bars.iter().map(|bar| bar.close)
    }
}

pub(crate) fn ensure_ascending<T: Dated>(rows: &[T]) -> Result<(), ValidationError> {
    for pair in rows.windows(2) {
        let (previous, next) = (pair[0].date(), pair[1].date());
        if previous >= next {
            return Err(ValidationError::UnorderedDates {
                previous: format_date(previous),
                next: format_date(next),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_date;

    fn raw(date: &str, close: Option<f64>) -> RawBar {
        RawBar::new(
            parse_date(date).expect("date"),
            close,
            close,
            close,
            close,
            Some(1_000.0),
        )
    }

    #[test]
    fn nan_counts_as_missing() {
        let bar = raw("2020-01-02", Some(f64::NAN));
        assert_eq!(bar.value(BarField::Close), None);
        assert!(!bar.is_complete());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let err = RawBarSeries::new(
            ticker,
            vec![raw("2020-01-02", Some(1.0)), raw("2020-01-02", Some(2.0))],
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::UnorderedDates { .. }));
    }

    #[test]
    fn from_unordered_sorts_and_keeps_last_duplicate() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let series = RawBarSeries::from_unordered(
            ticker,
            vec![
                raw("2020-01-03", Some(3.0)),
                raw("2020-01-02", Some(1.0)),
                raw("2020-01-02", Some(2.0)),
            ],
        );
        let closes: Vec<_> = series.bars().iter().map(|bar| bar.close).collect();
        assert_eq!(closes, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn bar_rejects_non_finite_fields() {
        let date = parse_date("2020-01-02").expect("date");
        let err = Bar::new(date, 1.0, 1.0, 1.0, 1.0, f64::INFINITY).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::NonFiniteValue { field: "volume" }
        ));
    }

    #[test]
    fn deserializes_nulls_as_missing() {
        let bar: RawBar =
            serde_json::from_str(r#"{"date":"2020-01-02","open":1.5,"close":null}"#)
                .expect("deserialize");
        assert_eq!(bar.open, Some(1.5));
        assert_eq!(bar.close, None);
        assert_eq!(bar.volume, None);
    }
}
