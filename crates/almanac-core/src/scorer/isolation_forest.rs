//! Isolation forest scorer.
//!
//! Anomalies need fewer random axis-aligned splits to isolate, so their mean
//! path length across trees is short. Scores follow `2^(-E[h(x)] / c(ψ))`
//! where `ψ` is the per-tree sample size; rows scoring above the training
//! quantile implied by the contamination fraction are labeled anomalous.
//!
//! The comparison is strict. Rows tied with the score at the cut stay normal,
//! so a fit can flag fewer than `⌈c·n⌉` rows and flags none when every score
//! ties, as with constant features.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{AnomalyScorer, FittedScorer, ScorerConfig, ScorerError};
use crate::{AnomalyLabel, FeatureMatrix};

const NAME: &str = "isolation_forest";
const EULER_GAMMA: f64 = 0.577_215_664_9;

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    root: Node,
}

impl Tree {
    fn grow(data: &Array2<f64>, indices: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_node(data, indices, 0, max_depth, rng),
        }
    }

    fn path_length(&self, sample: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold { &**left } else { &**right };
                    depth += 1;
                }
            }
        }
    }
}

fn grow_node(
    data: &Array2<f64>,
    indices: &mut [usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let feature = rng.gen_range(0..data.ncols());
    let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
        let value = data[[i, feature]];
        (lo.min(value), hi.max(value))
    });
    if !min.is_finite() || !max.is_finite() || max - min < 1e-10 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Convex combination stays finite even when `max - min` overflows.
    let weight: f64 = rng.gen();
    let threshold = (1.0 - weight) * min + weight * max;
    if !threshold.is_finite() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // In-place partition: rows below the threshold move to the front.
    let mut boundary = 0;
    for cursor in 0..indices.len() {
        if data[[indices[cursor], feature]] < threshold {
            indices.swap(boundary, cursor);
            boundary += 1;
        }
    }
    if boundary == 0 || boundary == indices.len() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (lower, upper) = indices.split_at_mut(boundary);
    Node::Split {
        feature,
        threshold,
        left: Box::new(grow_node(data, lower, depth + 1, max_depth, rng)),
        right: Box::new(grow_node(data, upper, depth + 1, max_depth, rng)),
    }
}

/// Mean path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Seeded isolation forest implementing [`AnomalyScorer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsolationForestScorer {
    seed: u64,
    max_samples: usize,
}

impl IsolationForestScorer {
    pub const MIN_ROWS: usize = 2;
    pub const DEFAULT_MAX_SAMPLES: usize = 256;

    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            max_samples: Self::DEFAULT_MAX_SAMPLES,
        }
    }

    /// Cap on rows drawn per tree. Values below 2 are raised to 2.
    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples.max(2);
        self
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for IsolationForestScorer {
    fn default() -> Self {
        Self::new(42)
    }
}

impl AnomalyScorer for IsolationForestScorer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn fit(
        &self,
        matrix: &FeatureMatrix,
        config: ScorerConfig,
    ) -> Result<Box<dyn FittedScorer>, ScorerError> {
        let rows = matrix.len();
        if rows < Self::MIN_ROWS {
            return Err(ScorerError::TooFewRows {
                scorer: NAME,
                required: Self::MIN_ROWS,
                actual: rows,
            });
        }

        let data = matrix.to_array();
        let sample_size = self.max_samples.min(rows);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees = (0..config.estimator_count())
            .map(|_| {
                let mut indices = rand::seq::index::sample(&mut rng, rows, sample_size).into_vec();
                Tree::grow(&data, &mut indices, max_depth, &mut rng)
            })
            .collect();

        let mut forest = FittedForest {
            trees,
            sample_size,
            threshold: f64::INFINITY,
        };

        let mut training = forest.scores(&data);
        training.sort_by(|a, b| b.total_cmp(a));
        let cut = ((rows as f64) * config.contamination_fraction()).ceil() as usize;
        forest.threshold = training[cut.min(rows - 1)];

        Ok(Box::new(forest))
    }
}

struct FittedForest {
    trees: Vec<Tree>,
    sample_size: usize,
    threshold: f64,
}

impl FittedForest {
    fn scores(&self, data: &Array2<f64>) -> Vec<f64> {
        let normalizer = average_path_length(self.sample_size);
        data.rows()
            .into_iter()
            .map(|sample| {
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(sample))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                if normalizer > 0.0 {
                    2.0_f64.powf(-mean_path / normalizer)
                } else {
                    0.5
                }
            })
            .collect()
    }
}

impl FittedScorer for FittedForest {
    fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<AnomalyLabel>, ScorerError> {
        Ok(self
            .scores(&matrix.to_array())
            .into_iter()
            .map(|score| {
                if score > self.threshold {
                    AnomalyLabel::Anomalous
                } else {
                    AnomalyLabel::Normal
                }
            })
            .collect())
    }
}
