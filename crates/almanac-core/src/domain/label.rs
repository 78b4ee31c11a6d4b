use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use super::bar::Dated;
use super::date::iso_date;

/// Per-row scorer verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLabel {
    Normal,
    Anomalous,
}

impl AnomalyLabel {
    pub const fn is_anomalous(self) -> bool {
        matches!(self, Self::Anomalous)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Anomalous => "anomalous",
        }
    }
}

impl Display for AnomalyLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged day, in the shape a chart overlay consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub close: f64,
    pub label: AnomalyLabel,
}

impl Dated for Anomaly {
    fn date(&self) -> Date {
        self.date
    }
}
