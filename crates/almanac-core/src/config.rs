//! Pipeline configuration.
//!
//! ```yaml
//! scorer:
//!   estimator_count: 100
//!   contamination_fraction: 0.01
//! grid:
//!   estimator_counts: [50, 100, 200]
//!   contamination_fractions: [0.01, 0.02, 0.05]
//! select_model: false
//! seed: 42
//! max_samples: 256
//! ```
//!
//! Every key is optional; missing keys take the defaults above.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scorer::{IsolationForestScorer, ScorerConfig};
use crate::{ConfigError, ScorerGrid, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Config used when model selection is off.
    pub scorer: ScorerConfig,
    pub grid: ScorerGrid,
    pub select_model: bool,
    pub seed: u64,
    pub max_samples: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scorer: ScorerConfig::default(),
            grid: ScorerGrid::default(),
            select_model: false,
            seed: 42,
            max_samples: IsolationForestScorer::DEFAULT_MAX_SAMPLES,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;
        debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Checks invariants serde cannot express. Scorer configs and grids
    /// validate themselves during deserialization.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_samples < 2 {
            return Err(ValidationError::MaxSamplesTooSmall);
        }
        Ok(())
    }

    pub fn scorer(&self) -> IsolationForestScorer {
        IsolationForestScorer::new(self.seed).with_max_samples(self.max_samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = PipelineConfig::from_yaml_str("{}").expect("config");
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.scorer.estimator_count(), 100);
        assert_eq!(config.grid.len(), 9);
    }

    #[test]
    fn partial_document_overrides_named_keys() {
        let config = PipelineConfig::from_yaml_str(
            "select_model: true\nseed: 7\ngrid:\n  estimator_counts: [10]\n  contamination_fractions: [0.1, 0.2]\n",
        )
        .expect("config");
        assert!(config.select_model);
        assert_eq!(config.seed, 7);
        assert_eq!(config.grid.len(), 2);
        assert_eq!(config.scorer().seed(), 7);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = PipelineConfig::from_yaml_str("max_samples: 1\n").expect_err("must fail");
        assert!(matches!(err, ConfigError::Validation(ValidationError::MaxSamplesTooSmall)));

        let err = PipelineConfig::from_yaml_str(
            "scorer:\n  estimator_count: 0\n  contamination_fraction: 0.1\n",
        )
        .expect_err("must fail");
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("estimators: 5\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("almanac.yaml");
        std::fs::write(&path, "seed: 99\n").expect("write");
        let config = PipelineConfig::from_path(&path).expect("config");
        assert_eq!(config.seed, 99);

        let missing = PipelineConfig::from_path(dir.path().join("absent.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
