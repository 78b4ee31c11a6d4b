//! Label agreement metrics with ANOMALOUS as the positive class.

use serde::Serialize;

use crate::{AnomalyLabel, PipelineError};

/// Precision, recall, and F1 plus the confusion counts they derive from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ClassificationMetrics {
    pub const fn support(&self) -> usize {
        self.true_positives + self.false_negatives
    }
}

/// Compare `predicted` against `truth`. Zero denominators yield 0.0.
///
/// # Errors
///
/// [`PipelineError::LengthMismatch`] when the sequences differ in length.
pub fn evaluate(
    truth: &[AnomalyLabel],
    predicted: &[AnomalyLabel],
) -> Result<ClassificationMetrics, PipelineError> {
    if truth.len() != predicted.len() {
        return Err(PipelineError::LengthMismatch {
            expected: truth.len(),
            actual: predicted.len(),
        });
    }

    let (mut tp, mut fp, mut fn_, mut tn) = (0, 0, 0, 0);
    for (actual, guess) in truth.iter().zip(predicted) {
        match (actual.is_anomalous(), guess.is_anomalous()) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => tn += 1,
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        precision,
        recall,
        f1,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        true_negatives: tn,
    })
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
