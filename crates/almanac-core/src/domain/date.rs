use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// Serde adapter for `YYYY-MM-DD` dates, used with `#[serde(with = "iso_date")]`.
pub mod iso_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(D::Error::custom)
    }
}

/// Inclusive calendar date window for a quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(with = "iso_date")]
    pub start: Date,
    #[serde(with = "iso_date")]
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange {
                start: format_date(start),
                end: format_date(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub(crate) fn ensure_contains(&self, date: Date) -> Result<(), ValidationError> {
        if self.contains(date) {
            return Ok(());
        }
        Err(ValidationError::DateOutsideRange {
            date: format_date(date),
            start: format_date(self.start),
            end: format_date(self.end),
        })
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", format_date(self.start), format_date(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_iso_dates() {
        let date = parse_date("2020-01-31").expect("must parse");
        assert_eq!(format_date(date), "2020-01-31");
        assert!(matches!(
            parse_date("01/31/2020"),
            Err(ValidationError::InvalidDate { .. })
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::parse("2020-12-31", "2020-01-01").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedDateRange { .. }));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let range = DateRange::parse("2020-01-01", "2020-01-31").expect("range");
        assert!(range.contains(parse_date("2020-01-01").expect("date")));
        assert!(range.contains(parse_date("2020-01-31").expect("date")));
        assert!(!range.contains(parse_date("2020-02-01").expect("date")));
    }

    #[test]
    fn serializes_range_as_iso_strings() {
        let range = DateRange::parse("2020-01-01", "2020-12-31").expect("range");
        let json = serde_json::to_string(&range).expect("serialize");
        assert_eq!(json, r#"{"start":"2020-01-01","end":"2020-12-31"}"#);
        let back: DateRange = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, range);
    }
}
