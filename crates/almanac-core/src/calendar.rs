//! Calendar-rule cohorts.
//!
//! A [`CalendarRule`] marks a date "in period" when a calendar field (month or
//! ISO weekday) falls inside an inclusive code range. The partitioner works
//! on any [`Dated`] row so it can run on raw bars, clean bars, or feature
//! rows.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;
use tracing::debug;

use crate::{
    BarSeries, DateRange, Dated, FeatureMatrix, RawBarSeries, ValidationError,
};

/// Calendar field a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarField {
    /// 1 = January … 12 = December.
    Month,
    /// 1 = Monday … 7 = Sunday.
    IsoWeekday,
}

impl CalendarField {
    pub const fn max_code(self) -> u8 {
        match self {
            Self::Month => 12,
            Self::IsoWeekday => 7,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::IsoWeekday => "iso_weekday",
        }
    }

    pub fn code(self, date: Date) -> u8 {
        match self {
            Self::Month => u8::from(date.month()),
            Self::IsoWeekday => date.weekday().number_from_monday(),
        }
    }
}

/// Inclusive `start..=end` range of calendar codes; `start > end` wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarRule {
    pub field: CalendarField,
    pub start: u8,
    pub end: u8,
}

impl CalendarRule {
    pub fn new(field: CalendarField, start: u8, end: u8) -> Result<Self, ValidationError> {
        for code in [start, end] {
            if code == 0 || code > field.max_code() {
                return Err(ValidationError::CalendarCodeOutOfRange {
                    field: field.as_str(),
                    code,
                    max: field.max_code(),
                });
            }
        }
        Ok(Self { field, start, end })
    }

    pub const fn january() -> Self {
        Self {
            field: CalendarField::Month,
            start: 1,
            end: 1,
        }
    }

    pub const fn weekend() -> Self {
        Self {
            field: CalendarField::IsoWeekday,
            start: 6,
            end: 7,
        }
    }

    pub fn contains(&self, date: Date) -> bool {
        let code = self.field.code(date);
        if self.start <= self.end {
            (self.start..=self.end).contains(&code)
        } else {
            code >= self.start || code <= self.end
        }
    }

    /// Split `rows` into `(in_period, out_of_period)`, preserving order.
    ///
    /// # Errors
    ///
    /// [`ValidationError::DateOutsideRange`] if any row lies outside `range`.
    pub fn partition<T: Dated>(
        &self,
        rows: Vec<T>,
        range: &DateRange,
    ) -> Result<(Vec<T>, Vec<T>), ValidationError> {
        for row in &rows {
            range.ensure_contains(row.date())?;
        }
        let (in_period, out_of_period): (Vec<T>, Vec<T>) =
            rows.into_iter().partition(|row| self.contains(row.date()));
        debug!(
            rule = %self,
            in_period = in_period.len(),
            out_of_period = out_of_period.len(),
            "partitioned rows by calendar rule"
        );
        Ok((in_period, out_of_period))
    }
}

impl Display for CalendarRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}..={}]", self.field.as_str(), self.start, self.end)
    }
}

/// Named calendar effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEffect {
    January,
    Weekend,
}

impl CalendarEffect {
    pub const ALL: [Self; 2] = [Self::January, Self::Weekend];

    pub const fn rule(self) -> CalendarRule {
        match self {
            Self::January => CalendarRule::january(),
            Self::Weekend => CalendarRule::weekend(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::January => "january",
            Self::Weekend => "weekend",
        }
    }
}

impl Display for CalendarEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarEffect {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "january" => Ok(Self::January),
            "weekend" => Ok(Self::Weekend),
            other => Err(ValidationError::UnknownCalendarEffect {
                value: other.to_owned(),
            }),
        }
    }
}

/// In-period and out-of-period cohorts of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSplit<S> {
    pub in_period: S,
    pub out_of_period: S,
}

pub fn partition_raw(
    series: RawBarSeries,
    range: &DateRange,
    rule: &CalendarRule,
) -> Result<CalendarSplit<RawBarSeries>, ValidationError> {
    let (ticker, bars) = series.into_parts();
    let (in_period, out_of_period) = rule.partition(bars, range)?;
    Ok(CalendarSplit {
        in_period: RawBarSeries::new(ticker.clone(), in_period)?,
        out_of_period: RawBarSeries::new(ticker, out_of_period)?,
    })
}

pub fn partition_bars(
    series: &BarSeries,
    range: &DateRange,
    rule: &CalendarRule,
) -> Result<CalendarSplit<BarSeries>, ValidationError> {
    let (in_period, out_of_period) = rule.partition(series.bars().to_vec(), range)?;
    Ok(CalendarSplit {
        in_period: BarSeries::new(series.ticker().clone(), in_period)?,
        out_of_period: BarSeries::new(series.ticker().clone(), out_of_period)?,
    })
}

/// Split an engineered matrix. Features keep the values computed over the
/// whole series; only row membership changes.
pub fn partition_features(
    matrix: &FeatureMatrix,
    range: &DateRange,
    rule: &CalendarRule,
) -> Result<CalendarSplit<FeatureMatrix>, ValidationError> {
    let (in_period, out_of_period) = rule.partition(matrix.rows().to_vec(), range)?;
    Ok(CalendarSplit {
        in_period: FeatureMatrix::new(matrix.ticker().clone(), in_period)?,
        out_of_period: FeatureMatrix::new(matrix.ticker().clone(), out_of_period)?,
    })
}
