//! # Domain Models
//!
//! Daily bar types shared by every pipeline stage.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RawBar`] / [`RawBarSeries`] | Bars as fetched, numeric fields optional |
//! | [`Bar`] / [`BarSeries`] | Cleaned bars, every field finite |
//! | [`DateRange`] | Inclusive request window |
//! | [`Ticker`] | Validated instrument ticker |
//! | [`AnomalyLabel`] / [`Anomaly`] | Scorer output |
//!
//! Series constructors reject unordered or duplicated dates:
//!
//! ```rust
//! use almanac_core::{parse_date, RawBar, RawBarSeries, Ticker, ValidationError};
//!
//! let day = parse_date("2020-01-02").unwrap();
//! let bar = RawBar::new(day, Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(10.0));
//! let err = RawBarSeries::new(Ticker::parse("AAPL").unwrap(), vec![bar.clone(), bar]);
//! assert!(matches!(err, Err(ValidationError::UnorderedDates { .. })));
//! ```

mod bar;
mod date;
mod label;
mod ticker;

pub use bar::{Bar, BarField, BarSeries, Dated, RawBar, RawBarSeries};
pub(crate) use bar::ensure_ascending;
pub use date::{format_date, iso_date, parse_date, DateRange};
pub use label::{Anomaly, AnomalyLabel};
pub use ticker::Ticker;
