//! Quote sources that supply raw daily bars.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::Weekday;
use tracing::debug;

use crate::{DateRange, RawBar, RawBarSeries, Ticker};

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    NotFound,
    Unavailable,
    InvalidRequest,
    Malformed,
    Internal,
}

/// Structured quote source error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn not_found(ticker: &Ticker) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: format!("no bars available for '{ticker}'"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for daily bars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    pub ticker: Ticker,
    pub range: DateRange,
}

impl BarsRequest {
    pub const fn new(ticker: Ticker, range: DateRange) -> Self {
        Self { ticker, range }
    }
}

/// Anything that can produce raw bars for a ticker and date range.
///
/// A source may return fewer rows than the range spans (holidays, gaps) but
/// never rows outside it.
pub trait QuoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn bars(&self, request: &BarsRequest) -> Result<RawBarSeries, SourceError>;
}

/// Reads `<dir>/<TICKER>.json`, a JSON array of raw bars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, ticker: &Ticker) -> PathBuf {
        self.dir.join(format!("{ticker}.json"))
    }
}

impl QuoteSource for JsonFileSource {
    fn name(&self) -> &'static str {
        "json_file"
    }

    fn bars(&self, request: &BarsRequest) -> Result<RawBarSeries, SourceError> {
        let path = self.path_for(&request.ticker);
        let payload = match std::fs::read_to_string(&path) {
            Ok(payload) => payload,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::not_found(&request.ticker));
            }
            Err(error) => {
                return Err(SourceError::unavailable(format!(
                    "failed to read {}: {error}",
                    path.display()
                )));
            }
        };

        let bars: Vec<RawBar> = serde_json::from_str(&payload).map_err(|error| {
            SourceError::malformed(format!("{}: {error}", path.display()))
        })?;
        let total = bars.len();
        let in_range: Vec<RawBar> = bars
            .into_iter()
            .filter(|bar| request.range.contains(bar.date))
            .collect();

        debug!(
            ticker = %request.ticker,
            path = %path.display(),
            total,
            rows = in_range.len(),
            "loaded bars from file"
        );

        Ok(RawBarSeries::from_unordered(request.ticker.clone(), in_range))
    }
}

/// Deterministic random-walk bars on weekdays, for demos and tests.
///
/// The walk for a ticker depends only on the seed and the ticker, so the same
/// request always yields the same series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSource {
    seed: u64,
    missing_rate: f64,
}

impl SyntheticSource {
    pub const DEFAULT_MISSING_RATE: f64 = 0.02;

    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            missing_rate: Self::DEFAULT_MISSING_RATE,
        }
    }

    /// Probability that any single field of a bar is missing. Clamped to `[0, 1]`.
    pub fn with_missing_rate(mut self, missing_rate: f64) -> Self {
        self.missing_rate = if missing_rate.is_finite() {
            missing_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    fn ticker_seed(&self, ticker: &Ticker) -> u64 {
        // FNV-1a over the ticker bytes, mixed with the source seed.
        let hash = ticker
            .as_str()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
                (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
            });
        hash ^ self.seed
    }

    fn maybe(&self, rng: &mut StdRng, value: f64) -> Option<f64> {
        (!rng.gen_bool(self.missing_rate)).then_some(value)
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(42)
    }
}

impl QuoteSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn bars(&self, request: &BarsRequest) -> Result<RawBarSeries, SourceError> {
        let mut rng = StdRng::seed_from_u64(self.ticker_seed(&request.ticker));
        let mut close: f64 = rng.gen_range(20.0..400.0);
        let mut bars = Vec::new();
        let mut date = request.range.start;

        loop {
            if !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday) {
                let open = close * (1.0 + rng.gen_range(-0.01..0.01));
                close = (close * (1.0 + rng.gen_range(-0.03..0.03))).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();
                bars.push(RawBar::new(
                    date,
                    self.maybe(&mut rng, open),
                    self.maybe(&mut rng, high),
                    self.maybe(&mut rng, low),
                    self.maybe(&mut rng, close),
                    self.maybe(&mut rng, volume),
                ));
            }
            if date >= request.range.end {
                break;
            }
            date = match date.next_day() {
                Some(next) => next,
                None => break,
            };
        }

        debug!(ticker = %request.ticker, rows = bars.len(), "generated synthetic bars");
        RawBarSeries::new(request.ticker.clone(), bars)
            .map_err(|error| SourceError::internal(error.to_string()))
    }
}
