use thiserror::Error;

use crate::scorer::ScorerError;
use crate::source::SourceError;

/// Validation and contract errors exposed by `almanac-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: String, end: String },
    #[error("bar dated {date} falls outside the requested range {start}..={end}")]
    DateOutsideRange {
        date: String,
        start: String,
        end: String,
    },
    #[error("bar dates must be strictly ascending: {previous} is followed by {next}")]
    UnorderedDates { previous: String, next: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },

    #[error("estimator_count must be at least 1")]
    ZeroEstimators,
    #[error("contamination_fraction must lie in (0, 0.5): {value}")]
    ContaminationOutOfRange { value: String },
    #[error("hyperparameter grid must contain at least one config")]
    EmptyGrid,
    #[error("max_samples must be at least 2")]
    MaxSamplesTooSmall,

    #[error("calendar code {code} is out of range 1..={max} for {field}")]
    CalendarCodeOutOfRange {
        field: &'static str,
        code: u8,
        max: u8,
    },
    #[error("unknown calendar effect '{value}', expected one of january, weekend")]
    UnknownCalendarEffect { value: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Failure modes of the cleaning, feature, selection, detection, and evaluation stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no rows left after cleaning ({input_rows} raw rows supplied)")]
    InsufficientData { input_rows: usize },

    #[error("feature engineering requires at least one bar")]
    EmptySeries,

    #[error("every one of the {attempted} hyperparameter configs failed to fit")]
    NoFeasibleConfig {
        attempted: usize,
        failures: Vec<ScorerError>,
    },

    #[error("non-finite feature value in row {row}, column '{column}' cannot be scored")]
    UnscoredData { row: usize, column: &'static str },

    #[error("label sequences differ in length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl PipelineError {
    /// Stable machine-readable code used in CLI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "pipeline.insufficient_data",
            Self::EmptySeries => "pipeline.empty_series",
            Self::NoFeasibleConfig { .. } => "pipeline.no_feasible_config",
            Self::UnscoredData { .. } => "pipeline.unscored_data",
            Self::LengthMismatch { .. } => "pipeline.length_mismatch",
            Self::Validation(_) => "pipeline.validation",
            Self::Scorer(_) => "pipeline.scorer",
            Self::Source(error) => error.code(),
        }
    }
}

/// Top-level error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
}
