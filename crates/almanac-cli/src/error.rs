use almanac_core::{ConfigError, PipelineError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) | Self::Command(_) => 2,
            Self::Pipeline(PipelineError::Source(_)) => 4,
            Self::Pipeline(_) => 3,
            Self::Serialization(_) => 5,
            Self::StrictModeViolation { .. } => 6,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::{SourceError, Ticker};

    #[test]
    fn source_failures_have_their_own_exit_code() {
        let ticker = Ticker::parse("AAPL").expect("ticker");
        let error = CliError::from(PipelineError::from(SourceError::not_found(&ticker)));
        assert_eq!(error.exit_code(), 4);
        assert_eq!(CliError::from(PipelineError::EmptySeries).exit_code(), 3);
        assert_eq!(CliError::from(ValidationError::EmptyGrid).exit_code(), 2);
    }
}
