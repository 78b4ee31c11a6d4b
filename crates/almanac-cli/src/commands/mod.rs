mod calendar;
mod detect;
mod evaluate;
mod grid;

use std::time::Instant;

use almanac_core::{
    DateRange, JsonFileSource, PipelineConfig, QuoteSource, ScorerConfig, SyntheticSource, Ticker,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command, WindowArgs};
use crate::envelope::{Envelope, EnvelopeError, EnvelopeMeta};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

pub fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let config = load_config(cli)?;
    let source = quote_source(cli, &config);

    let CommandResult {
        data,
        warnings,
        errors,
    } = match &cli.command {
        Command::Detect(args) => detect::run(args, config, source.as_ref())?,
        Command::Calendar(args) => calendar::run(args, config, source.as_ref())?,
        Command::Evaluate(args) => evaluate::run(args)?,
        Command::Grid => grid::run(&config)?,
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope { meta, data, errors })
}

fn load_config(cli: &Cli) -> Result<PipelineConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    debug!(?config, "effective pipeline config");
    Ok(config)
}

fn quote_source(cli: &Cli, config: &PipelineConfig) -> Box<dyn QuoteSource> {
    match &cli.data_dir {
        Some(dir) => Box::new(JsonFileSource::new(dir.clone())),
        None => Box::new(SyntheticSource::new(config.seed)),
    }
}

/// Tickers, window and scorer overrides shared by `detect` and `calendar`.
pub(crate) struct Window {
    pub tickers: Vec<Ticker>,
    pub range: DateRange,
}

impl Window {
    pub fn parse(args: &WindowArgs, config: &mut PipelineConfig) -> Result<Self, CliError> {
        let tickers = args
            .tickers
            .iter()
            .map(|ticker| Ticker::parse(ticker))
            .collect::<Result<Vec<_>, _>>()?;
        let range = DateRange::parse(&args.start, &args.end)?;

        if args.estimators.is_some() || args.contamination.is_some() {
            config.scorer = ScorerConfig::new(
                args.estimators.unwrap_or(config.scorer.estimator_count()),
                args.contamination
                    .unwrap_or(config.scorer.contamination_fraction()),
            )?;
        }
        if args.select {
            config.select_model = true;
        }

        Ok(Self { tickers, range })
    }
}
