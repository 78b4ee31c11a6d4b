//! Core pipeline for almanac.
//!
//! This crate contains:
//! - Validated daily bar models and date handling
//! - Cleaning, feature engineering and calendar partitioning stages
//! - The anomaly scorer capability, model selection and detection
//! - Label evaluation, quote sources and pipeline configuration

pub mod calendar;
pub mod clean;
pub mod config;
pub mod detector;
pub mod domain;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod news;
pub mod pipeline;
pub mod scorer;
pub mod selection;
pub mod source;

pub use calendar::{
    partition_bars, partition_features, partition_raw, CalendarEffect, CalendarField,
    CalendarRule, CalendarSplit,
};
pub use clean::{clean, clean_with_stats, CleaningStats};
pub use config::PipelineConfig;
pub use detector::{detect, Detection};
pub use domain::{
    format_date, parse_date, Anomaly, AnomalyLabel, Bar, BarField, BarSeries, DateRange, Dated,
    RawBar, RawBarSeries, Ticker,
};
pub use error::{ConfigError, PipelineError, ValidationError};
pub use evaluate::{evaluate, ClassificationMetrics};
pub use features::{engineer, FeatureMatrix, FeatureRow, FEATURE_COLUMNS};
pub use news::{annotate, AnnotatedAnomaly, Headline, NewsLookup, NoNews};
pub use pipeline::{CalendarReport, Pipeline, RunReport, TickerRun};
pub use scorer::{AnomalyScorer, FittedScorer, IsolationForestScorer, ScorerConfig, ScorerError};
pub use selection::{
    select, GridPointReport, ScorerGrid, Selection, SelectionMetric, SelectionTarget,
};
pub use source::{
    BarsRequest, JsonFileSource, QuoteSource, SourceError, SourceErrorKind, SyntheticSource,
};
