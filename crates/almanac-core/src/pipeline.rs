//! Stage orchestration.
//!
//! A standard run is `clean -> engineer -> [select] -> detect -> annotate`.
//! A calendar run partitions the raw series by a [`CalendarRule`] and gives
//! each cohort its own standard run. Batch runs fetch each ticker from a
//! [`QuoteSource`] and keep per-ticker failures separate.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::partition_raw;
use crate::news::{annotate, AnnotatedAnomaly, NewsLookup, NoNews};
use crate::scorer::{AnomalyScorer, ScorerConfig, ScorerError};
use crate::selection::{select, Selection, SelectionTarget};
use crate::source::{BarsRequest, QuoteSource};
use crate::{
    clean_with_stats, detect, engineer, Anomaly, CalendarRule, CleaningStats, DateRange,
    FeatureMatrix, PipelineConfig, PipelineError, RawBarSeries, Ticker,
};

/// Outcome of one standard run, or of one calendar cohort.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub ticker: Ticker,
    pub cleaning: CleaningStats,
    /// Rows that reached the detector.
    pub rows: usize,
    pub config: ScorerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    pub anomaly_rate: f64,
    pub anomalies: Vec<Anomaly>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headlines: Vec<AnnotatedAnomaly>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RunReport {
    fn empty(ticker: Ticker, config: ScorerConfig) -> Self {
        Self {
            ticker,
            cleaning: CleaningStats::default(),
            rows: 0,
            config,
            selection: None,
            anomaly_rate: 0.0,
            anomalies: Vec::new(),
            headlines: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Both cohorts of a calendar-effect run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarReport {
    pub ticker: Ticker,
    pub rule: CalendarRule,
    pub range: DateRange,
    pub in_period: RunReport,
    pub out_of_period: RunReport,
}

impl CalendarReport {
    /// In-period anomaly rate minus out-of-period anomaly rate.
    pub fn rate_difference(&self) -> f64 {
        self.in_period.anomaly_rate - self.out_of_period.anomaly_rate
    }
}

/// Result for one ticker of a batch.
#[derive(Debug)]
pub struct TickerRun<R> {
    pub ticker: Ticker,
    pub result: Result<R, PipelineError>,
}

pub struct Pipeline {
    config: PipelineConfig,
    scorer: Arc<dyn AnomalyScorer>,
    news: Arc<dyn NewsLookup>,
}

impl Pipeline {
    /// Pipeline backed by the isolation forest built from `config`.
    pub fn new(config: PipelineConfig) -> Self {
        let scorer = Arc::new(config.scorer());
        Self::with_scorer(config, scorer)
    }

    pub fn with_scorer(config: PipelineConfig, scorer: Arc<dyn AnomalyScorer>) -> Self {
        Self {
            config,
            scorer,
            news: Arc::new(NoNews),
        }
    }

    pub fn with_news(mut self, news: Arc<dyn NewsLookup>) -> Self {
        self.news = news;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    pub fn run_standard(&self, raw: &RawBarSeries) -> Result<RunReport, PipelineError> {
        let (bars, cleaning) = clean_with_stats(raw)?;
        let matrix = engineer(&bars)?;
        self.score(matrix, cleaning)
    }

    /// Partition `raw` by `rule` and run each cohort independently. An empty
    /// cohort yields an empty report.
    pub fn run_calendar(
        &self,
        raw: RawBarSeries,
        range: &DateRange,
        rule: CalendarRule,
    ) -> Result<CalendarReport, PipelineError> {
        let ticker = raw.ticker().clone();
        let split = partition_raw(raw, range, &rule)?;
        let in_period = self.run_cohort(&split.in_period)?;
        let out_of_period = self.run_cohort(&split.out_of_period)?;

        info!(
            %ticker,
            %rule,
            in_period_rows = in_period.rows,
            in_period_anomalies = in_period.anomalies.len(),
            out_of_period_rows = out_of_period.rows,
            out_of_period_anomalies = out_of_period.anomalies.len(),
            "calendar run finished"
        );

        Ok(CalendarReport {
            ticker,
            rule,
            range: *range,
            in_period,
            out_of_period,
        })
    }

    /// Standard runs for every ticker. Results keep the order of `tickers`.
    pub fn run_batch(
        &self,
        source: &dyn QuoteSource,
        tickers: &[Ticker],
        range: &DateRange,
    ) -> Vec<TickerRun<RunReport>> {
        self.fan_out(source, tickers, range, |raw| self.run_standard(&raw))
    }

    pub fn run_calendar_batch(
        &self,
        source: &dyn QuoteSource,
        tickers: &[Ticker],
        range: &DateRange,
        rule: CalendarRule,
    ) -> Vec<TickerRun<CalendarReport>> {
        self.fan_out(source, tickers, range, |raw| self.run_calendar(raw, range, rule))
    }

    fn fan_out<R, F>(
        &self,
        source: &dyn QuoteSource,
        tickers: &[Ticker],
        range: &DateRange,
        run: F,
    ) -> Vec<TickerRun<R>>
    where
        R: Send,
        F: Fn(RawBarSeries) -> Result<R, PipelineError> + Sync,
    {
        tickers
            .par_iter()
            .map(|ticker| {
                let request = BarsRequest::new(ticker.clone(), *range);
                let result = source
                    .bars(&request)
                    .map_err(PipelineError::from)
                    .and_then(&run);
                if let Err(error) = &result {
                    warn!(%ticker, source = source.name(), code = error.code(), %error, "ticker run failed");
                }
                TickerRun {
                    ticker: ticker.clone(),
                    result,
                }
            })
            .collect()
    }

    /// A cohort too small for the scorer reports no anomalies plus a warning,
    /// like an empty one, so the other cohort still gets its report.
    fn run_cohort(&self, raw: &RawBarSeries) -> Result<RunReport, PipelineError> {
        if raw.is_empty() {
            return Ok(RunReport::empty(raw.ticker().clone(), self.config.scorer));
        }
        match self.run_standard(raw) {
            Err(error) if is_undersized(&error) => {
                warn!(ticker = %raw.ticker(), rows = raw.len(), %error, "cohort left unscored");
                let mut report = RunReport::empty(raw.ticker().clone(), self.config.scorer);
                report
                    .warnings
                    .push(format!("cohort of {} bars left unscored: {error}", raw.len()));
                Ok(report)
            }
            outcome => outcome,
        }
    }

    fn score(
        &self,
        matrix: FeatureMatrix,
        cleaning: CleaningStats,
    ) -> Result<RunReport, PipelineError> {
        let mut warnings = Vec::new();
        let (config, selection) = if self.config.select_model {
            let selection = select(
                self.scorer.as_ref(),
                &matrix,
                &self.config.grid,
                SelectionTarget::SelfConsistency,
            )?;
            warnings.extend(selection.warnings.iter().cloned());
            (selection.config, Some(selection))
        } else {
            (self.config.scorer, None)
        };

        let detection = detect(self.scorer.as_ref(), &matrix, config)?;
        let headlines = annotate(self.news.as_ref(), matrix.ticker(), &detection.anomalies)
            .into_iter()
            .filter(|annotated| !annotated.headlines.is_empty())
            .collect();

        Ok(RunReport {
            ticker: matrix.ticker().clone(),
            cleaning,
            rows: matrix.len(),
            config,
            selection,
            anomaly_rate: detection.anomaly_rate(),
            anomalies: detection.anomalies,
            headlines,
            warnings,
        })
    }
}

fn is_undersized(error: &PipelineError) -> bool {
    match error {
        PipelineError::Scorer(ScorerError::TooFewRows { .. }) => true,
        PipelineError::NoFeasibleConfig { failures, .. } => {
            !failures.is_empty()
                && failures
                    .iter()
                    .all(|failure| matches!(failure, ScorerError::TooFewRows { .. }))
        }
        _ => false,
    }
}
