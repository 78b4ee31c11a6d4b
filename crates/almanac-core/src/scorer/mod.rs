//! Anomaly scorer capability.
//!
//! The pipeline never depends on a particular scoring algorithm. A scorer is
//! fitted once per [`ScorerConfig`] and the fitted handle labels rows of a
//! [`FeatureMatrix`]:
//!
//! ```rust,ignore
//! let fitted = scorer.fit(&matrix, config)?;
//! let labels = fitted.predict(&matrix)?;
//! assert_eq!(labels.len(), matrix.len());
//! ```
//!
//! [`IsolationForestScorer`] is the bundled implementation.

mod isolation_forest;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AnomalyLabel, FeatureMatrix, ValidationError};

pub use isolation_forest::IsolationForestScorer;

/// Scorer hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScorerConfigFields")]
pub struct ScorerConfig {
    estimator_count: usize,
    contamination_fraction: f64,
}

#[derive(Deserialize)]
struct ScorerConfigFields {
    estimator_count: usize,
    contamination_fraction: f64,
}

impl TryFrom<ScorerConfigFields> for ScorerConfig {
    type Error = ValidationError;

    fn try_from(fields: ScorerConfigFields) -> Result<Self, Self::Error> {
        Self::new(fields.estimator_count, fields.contamination_fraction)
    }
}

impl ScorerConfig {
    pub fn new(estimator_count: usize, contamination_fraction: f64) -> Result<Self, ValidationError> {
        if estimator_count == 0 {
            return Err(ValidationError::ZeroEstimators);
        }
        let in_range = contamination_fraction > 0.0 && contamination_fraction < 0.5;
        if !in_range {
            return Err(ValidationError::ContaminationOutOfRange {
                value: contamination_fraction.to_string(),
            });
        }
        Ok(Self {
            estimator_count,
            contamination_fraction,
        })
    }

    pub const fn estimator_count(&self) -> usize {
        self.estimator_count
    }

    pub const fn contamination_fraction(&self) -> f64 {
        self.contamination_fraction
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            estimator_count: 100,
            contamination_fraction: 0.01,
        }
    }
}

impl Display for ScorerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "estimators={} contamination={}",
            self.estimator_count, self.contamination_fraction
        )
    }
}

/// Scorer failure classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScorerError {
    #[error("{scorer} needs at least {required} rows to fit, got {actual}")]
    TooFewRows {
        scorer: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("{scorer} returned {actual} labels for {expected} rows")]
    MisalignedPrediction {
        scorer: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{scorer} failed: {message}")]
    Internal {
        scorer: &'static str,
        message: String,
    },
}

/// Fit half of the scorer contract.
///
/// Implementations must be `Send + Sync`: model selection fits grid points
/// concurrently against one shared scorer.
pub trait AnomalyScorer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on `matrix` with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ScorerError::TooFewRows`] when the matrix is too small for
    /// the algorithm.
    fn fit(
        &self,
        matrix: &FeatureMatrix,
        config: ScorerConfig,
    ) -> Result<Box<dyn FittedScorer>, ScorerError>;
}

/// Predict half of the scorer contract.
pub trait FittedScorer: Send + Sync {
    /// One label per row of `matrix`, in row order.
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>, ScorerError>;
}
