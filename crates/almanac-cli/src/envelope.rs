use almanac_core::{PipelineError, Ticker};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CliError;

pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Standard response envelope for all `almanac` outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(latency_ms: u64) -> Result<Self, CliError> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| CliError::Command(format!("failed to format timestamp: {error}")))?;
        Ok(Self {
            request_id: Uuid::new_v4().to_string(),
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at,
            latency_ms,
            warnings: Vec::new(),
        })
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Structured error payload for partial or failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl EnvelopeError {
    pub fn for_ticker(ticker: &Ticker, error: &PipelineError) -> Self {
        let retryable = match error {
            PipelineError::Source(source) => Some(source.retryable()),
            _ => None,
        };
        Self {
            code: error.code().to_owned(),
            message: error.to_string(),
            ticker: Some(ticker.to_string()),
            retryable,
        }
    }
}
