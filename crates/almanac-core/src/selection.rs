//! Hyperparameter grid search for anomaly scorers.
//!
//! Grid points are fitted concurrently with rayon, then scanned in
//! enumeration order (estimator count ascending, then contamination
//! ascending) so the earliest config wins ties regardless of which fit
//! finished first.
//!
//! Without ground-truth labels the only available target is
//! [`SelectionTarget::SelfConsistency`]: each config's labels are compared
//! with themselves. That metric is 1.0 for any config that flags at least one
//! row and 0.0 otherwise, so it says nothing about skill. It is reported as
//! `self_agreement` and a warning is emitted whenever it is used.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::scorer::{AnomalyScorer, ScorerConfig, ScorerError};
use crate::{evaluate, AnomalyLabel, FeatureMatrix, PipelineError, ValidationError};

pub const SELF_AGREEMENT_WARNING: &str = "model selection used the self-agreement proxy: each config is scored against its own labels, which cannot measure skill; supply ground-truth labels for a meaningful comparison";

/// Ordered cartesian grid of scorer configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridAxes", into = "GridAxes")]
pub struct ScorerGrid {
    estimator_counts: Vec<usize>,
    contamination_fractions: Vec<f64>,
    configs: Vec<ScorerConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GridAxes {
    estimator_counts: Vec<usize>,
    contamination_fractions: Vec<f64>,
}

impl TryFrom<GridAxes> for ScorerGrid {
    type Error = ValidationError;

    fn try_from(axes: GridAxes) -> Result<Self, Self::Error> {
        Self::new(&axes.estimator_counts, &axes.contamination_fractions)
    }
}

impl From<ScorerGrid> for GridAxes {
    fn from(grid: ScorerGrid) -> Self {
        Self {
            estimator_counts: grid.estimator_counts,
            contamination_fractions: grid.contamination_fractions,
        }
    }
}

impl ScorerGrid {
    pub const DEFAULT_ESTIMATOR_COUNTS: [usize; 3] = [50, 100, 200];
    pub const DEFAULT_CONTAMINATION_FRACTIONS: [f64; 3] = [0.01, 0.02, 0.05];

    /// Build the grid from its two axes. Each axis is sorted ascending and
    /// deduplicated before enumeration.
    pub fn new(
        estimator_counts: &[usize],
        contamination_fractions: &[f64],
    ) -> Result<Self, ValidationError> {
        let mut counts = estimator_counts.to_vec();
        counts.sort_unstable();
        counts.dedup();

        let mut fractions = contamination_fractions.to_vec();
        fractions.sort_by(f64::total_cmp);
        fractions.dedup();

        let mut configs = Vec::with_capacity(counts.len() * fractions.len());
        for count in &counts {
            for fraction in &fractions {
                configs.push(ScorerConfig::new(*count, *fraction)?);
            }
        }
        if configs.is_empty() {
            return Err(ValidationError::EmptyGrid);
        }

        Ok(Self {
            estimator_counts: counts,
            contamination_fractions: fractions,
            configs,
        })
    }

    /// Enumeration order used for tie-breaking.
    pub fn configs(&self) -> &[ScorerConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl Default for ScorerGrid {
    fn default() -> Self {
        let configs = Self::DEFAULT_ESTIMATOR_COUNTS
            .iter()
            .flat_map(|count| {
                Self::DEFAULT_CONTAMINATION_FRACTIONS
                    .iter()
                    .filter_map(move |fraction| ScorerConfig::new(*count, *fraction).ok())
            })
            .collect();
        Self {
            estimator_counts: Self::DEFAULT_ESTIMATOR_COUNTS.to_vec(),
            contamination_fractions: Self::DEFAULT_CONTAMINATION_FRACTIONS.to_vec(),
            configs,
        }
    }
}

/// What grid points are scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget<'a> {
    /// Each config's labels against themselves.
    SelfConsistency,
    /// Caller-supplied labels, one per matrix row.
    GroundTruth(&'a [AnomalyLabel]),
}

/// Name of the metric actually optimized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMetric {
    SelfAgreement,
    F1,
}

/// Result of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPointReport {
    pub config: ScorerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flagged: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Winning config plus the full grid trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub config: ScorerConfig,
    pub metric: SelectionMetric,
    pub score: f64,
    pub grid: Vec<GridPointReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Fit every grid point and return the best-scoring config.
///
/// # Errors
///
/// - [`PipelineError::UnscoredData`] if any feature value is non-finite.
/// - [`PipelineError::LengthMismatch`] if ground-truth labels do not match
///   the matrix length.
/// - [`PipelineError::NoFeasibleConfig`] if every grid point fails to fit.
pub fn select(
    scorer: &dyn AnomalyScorer,
    matrix: &FeatureMatrix,
    grid: &ScorerGrid,
    target: SelectionTarget<'_>,
) -> Result<Selection, PipelineError> {
    if let Some((row, column)) = matrix.first_non_finite() {
        return Err(PipelineError::UnscoredData { row, column });
    }
    let (metric, mut warnings) = match target {
        SelectionTarget::SelfConsistency => {
            warn!(ticker = %matrix.ticker(), "{SELF_AGREEMENT_WARNING}");
            (SelectionMetric::SelfAgreement, vec![SELF_AGREEMENT_WARNING.to_owned()])
        }
        SelectionTarget::GroundTruth(truth) => {
            if truth.len() != matrix.len() {
                return Err(PipelineError::LengthMismatch {
                    expected: matrix.len(),
                    actual: truth.len(),
                });
            }
            (SelectionMetric::F1, Vec::new())
        }
    };

    let outcomes: Vec<Result<(f64, usize), ScorerError>> = grid
        .configs()
        .par_iter()
        .map(|config| score_config(scorer, matrix, *config, target))
        .collect();

    let mut best: Option<(ScorerConfig, f64)> = None;
    let mut failures = Vec::new();
    let mut reports = Vec::with_capacity(outcomes.len());

    for (config, outcome) in grid.configs().iter().zip(outcomes) {
        match outcome {
            Ok((score, flagged)) => {
                debug!(%config, score, flagged, "scored grid point");
                if best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((*config, score));
                }
                reports.push(GridPointReport {
                    config: *config,
                    score: Some(score),
                    flagged: Some(flagged),
                    error: None,
                });
            }
            Err(error) => {
                debug!(%config, %error, "grid point failed to fit");
                reports.push(GridPointReport {
                    config: *config,
                    score: None,
                    flagged: None,
                    error: Some(error.to_string()),
                });
                failures.push(error);
            }
        }
    }

    let Some((config, score)) = best else {
        return Err(PipelineError::NoFeasibleConfig {
            attempted: grid.len(),
            failures,
        });
    };

    if !failures.is_empty() {
        warnings.push(format!(
            "{} of {} grid points failed to fit",
            failures.len(),
            grid.len()
        ));
    }

    info!(
        ticker = %matrix.ticker(),
        scorer = scorer.name(),
        %config,
        score,
        metric = ?metric,
        "selected scorer config"
    );

    Ok(Selection {
        config,
        metric,
        score,
        grid: reports,
        warnings,
    })
}

fn score_config(
    scorer: &dyn AnomalyScorer,
    matrix: &FeatureMatrix,
    config: ScorerConfig,
    target: SelectionTarget<'_>,
) -> Result<(f64, usize), ScorerError> {
    let labels = scorer.fit(matrix, config)?.predict(matrix)?;
    if labels.len() != matrix.len() {
        return Err(ScorerError::MisalignedPrediction {
            scorer: scorer.name(),
            expected: matrix.len(),
            actual: labels.len(),
        });
    }

    let reference = match target {
        SelectionTarget::SelfConsistency => labels.as_slice(),
        SelectionTarget::GroundTruth(truth) => truth,
    };
    let flagged = labels.iter().filter(|label| label.is_anomalous()).count();
    let metrics = evaluate(reference, &labels).map_err(|error| ScorerError::Internal {
        scorer: scorer.name(),
        message: error.to_string(),
    })?;
    Ok((metrics.f1, flagged))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_enumerates_nine_configs_in_order() {
        let grid = ScorerGrid::default();
        let pairs: Vec<(usize, f64)> = grid
            .configs()
            .iter()
            .map(|c| (c.estimator_count(), c.contamination_fraction()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (50, 0.01),
                (50, 0.02),
                (50, 0.05),
                (100, 0.01),
                (100, 0.02),
                (100, 0.05),
                (200, 0.01),
                (200, 0.02),
                (200, 0.05),
            ]
        );
    }

    #[test]
    fn custom_grid_is_sorted_and_deduplicated() {
        let grid = ScorerGrid::new(&[200, 50, 200], &[0.05, 0.01]).expect("grid");
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.configs()[0].estimator_count(), 50);
        assert_eq!(grid.configs()[0].contamination_fraction(), 0.01);
    }

    #[test]
    fn empty_axis_is_rejected() {
        assert!(matches!(
            ScorerGrid::new(&[], &[0.01]),
            Err(ValidationError::EmptyGrid)
        ));
        assert!(ScorerGrid::new(&[10], &[0.9]).is_err());
    }

    #[test]
    fn non_finite_features_never_reach_the_grid() {
        let start = crate::parse_date("2021-06-01").expect("date");
        let bars = (0..3)
            .map(|i| {
                let date = start + time::Duration::days(i);
                crate::Bar::new(date, 1.0, 1.0, 1.0, 1.0, 1.0).expect("bar")
            })
            .collect();
        let series =
            crate::BarSeries::new(crate::Ticker::parse("NAN").expect("ticker"), bars).expect("series");
        let clean = crate::engineer(&series).expect("features");
        let mut rows = clean.rows().to_vec();
        rows[2].pct_change = f64::INFINITY;
        let poisoned = FeatureMatrix::new(clean.ticker().clone(), rows).expect("matrix");

        let err = select(
            &crate::IsolationForestScorer::default(),
            &poisoned,
            &ScorerGrid::default(),
            SelectionTarget::SelfConsistency,
        )
        .expect_err("must fail");
        assert!(matches!(
            err,
            PipelineError::UnscoredData {
                row: 2,
                column: "pct_change"
            }
        ));
    }

    #[test]
    fn grid_round_trips_through_yaml_axes() {
        let grid: ScorerGrid = serde_yaml::from_str(
            "estimator_counts: [100, 50]\ncontamination_fractions: [0.02]\n",
        )
        .expect("grid");
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.configs()[0].estimator_count(), 50);
    }
}
