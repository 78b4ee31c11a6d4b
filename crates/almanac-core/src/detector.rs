//! Fit-and-label stage.

use serde::Serialize;
use tracing::{debug, info};

use crate::scorer::{AnomalyScorer, ScorerConfig, ScorerError};
use crate::{Anomaly, AnomalyLabel, FeatureMatrix, PipelineError};

/// Labels for every row plus the anomalous subset in row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub labels: Vec<AnomalyLabel>,
    pub anomalies: Vec<Anomaly>,
}

impl Detection {
    pub const fn empty() -> Self {
        Self {
            labels: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// Share of rows labeled anomalous; 0 for an empty detection.
    pub fn anomaly_rate(&self) -> f64 {
        if self.labels.is_empty() {
            0.0
        } else {
            self.anomalies.len() as f64 / self.labels.len() as f64
        }
    }
}

/// Fit `scorer` on `matrix` with `config` and label every row.
///
/// # Errors
///
/// - [`PipelineError::UnscoredData`] if any feature value is non-finite.
/// - [`PipelineError::Scorer`] if fitting fails or the scorer returns the
///   wrong number of labels.
pub fn detect(
    scorer: &dyn AnomalyScorer,
    matrix: &FeatureMatrix,
    config: ScorerConfig,
) -> Result<Detection, PipelineError> {
    if let Some((row, column)) = matrix.first_non_finite() {
        return Err(PipelineError::UnscoredData { row, column });
    }
    if matrix.is_empty() {
        debug!(ticker = %matrix.ticker(), "empty matrix, nothing to score");
        return Ok(Detection::empty());
    }

    let labels = scorer.fit(matrix, config)?.predict(matrix)?;
    if labels.len() != matrix.len() {
        return Err(ScorerError::MisalignedPrediction {
            scorer: scorer.name(),
            expected: matrix.len(),
            actual: labels.len(),
        }
        .into());
    }

    let anomalies: Vec<Anomaly> = matrix
        .rows()
        .iter()
        .zip(&labels)
        .filter(|(_, label)| label.is_anomalous())
        .map(|(row, label)| Anomaly {
            date: row.bar.date,
            close: row.bar.close,
            label: *label,
        })
        .collect();

    info!(
        ticker = %matrix.ticker(),
        scorer = scorer.name(),
        rows = matrix.len(),
        anomalies = anomalies.len(),
        estimator_count = config.estimator_count(),
        contamination = config.contamination_fraction(),
        "detected anomalies"
    );

    Ok(Detection { labels, anomalies })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::FittedScorer;
    use crate::{engineer, parse_date, Bar, BarSeries, FeatureRow, Ticker};

    /// Flags rows whose close exceeds a fixed level.
    struct AboveLevel(f64);

    struct FittedLevel(f64);

    impl AnomalyScorer for AboveLevel {
        fn name(&self) -> &'static str {
            "above_level"
        }

        fn fit(
            &self,
            _matrix: &FeatureMatrix,
            _config: ScorerConfig,
        ) -> Result<Box<dyn FittedScorer>, ScorerError> {
            Ok(Box::new(FittedLevel(self.0)))
        }
    }

    impl FittedScorer for FittedLevel {
        fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>, ScorerError> {
            Ok(matrix
                .rows()
                .iter()
                .map(|row| {
                    if row.bar.close > self.0 {
                        AnomalyLabel::Anomalous
                    } else {
                        AnomalyLabel::Normal
                    }
                })
                .collect())
        }
    }

    struct Truncating;

    impl AnomalyScorer for Truncating {
        fn name(&self) -> &'static str {
            "truncating"
        }

        fn fit(
            &self,
            _matrix: &FeatureMatrix,
            _config: ScorerConfig,
        ) -> Result<Box<dyn FittedScorer>, ScorerError> {
            Ok(Box::new(Truncating))
        }
    }

    impl FittedScorer for Truncating {
        fn predict(&self, _matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>, ScorerError> {
            Ok(vec![AnomalyLabel::Normal])
        }
    }

    fn matrix(closes: &[f64]) -> FeatureMatrix {
        let start = parse_date("2021-06-01").expect("date");
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let date = start + time::Duration::days(i as i64);
                Bar::new(date, *close, *close, *close, *close, 1_000.0).expect("bar")
            })
            .collect();
        engineer(&BarSeries::new(Ticker::parse("XOM").expect("ticker"), bars).expect("series"))
            .expect("features")
    }

    #[test]
    fn returns_anomalous_rows_in_order() {
        let detection = detect(
            &AboveLevel(50.0),
            &matrix(&[10.0, 90.0, 20.0, 80.0]),
            ScorerConfig::default(),
        )
        .expect("detect");

        assert_eq!(detection.labels.len(), 4);
        let closes: Vec<f64> = detection.anomalies.iter().map(|a| a.close).collect();
        assert_eq!(closes, vec![90.0, 80.0]);
        assert!((detection.anomaly_rate() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_skips_fitting() {
        let empty = FeatureMatrix::new(Ticker::parse("XOM").expect("ticker"), Vec::new())
            .expect("matrix");
        let detection = detect(&Truncating, &empty, ScorerConfig::default()).expect("detect");
        assert_eq!(detection, Detection::empty());
    }

    #[test]
    fn misaligned_labels_are_a_scorer_error() {
        let err = detect(&Truncating, &matrix(&[1.0, 2.0, 3.0]), ScorerConfig::default())
            .expect_err("must fail");
        assert!(matches!(
            err,
            PipelineError::Scorer(ScorerError::MisalignedPrediction { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn non_finite_features_are_rejected() {
        let source = matrix(&[1.0, 2.0]);
        let mut rows: Vec<FeatureRow> = source.rows().to_vec();
        rows[1].ma_5 = f64::NAN;
        let poisoned = FeatureMatrix::new(source.ticker().clone(), rows).expect("matrix");

        let err = detect(&AboveLevel(0.0), &poisoned, ScorerConfig::default())
            .expect_err("must fail");
        assert!(matches!(err, PipelineError::UnscoredData { row: 1, column: "ma_5" }));
    }
}
