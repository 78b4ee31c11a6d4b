use almanac_core::{format_date, Pipeline, PipelineConfig, QuoteSource};
use serde_json::json;

use crate::cli::DetectArgs;
use crate::envelope::EnvelopeError;
use crate::error::CliError;

use super::{CommandResult, Window};

pub fn run(
    args: &DetectArgs,
    mut config: PipelineConfig,
    source: &dyn QuoteSource,
) -> Result<CommandResult, CliError> {
    let window = Window::parse(&args.window, &mut config)?;
    let pipeline = Pipeline::new(config);

    let mut results = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for run in pipeline.run_batch(source, &window.tickers, &window.range) {
        match run.result {
            Ok(report) => {
                warnings.extend(
                    report
                        .warnings
                        .iter()
                        .map(|warning| format!("{}: {warning}", report.ticker)),
                );
                results.push(report);
            }
            Err(error) => errors.push(EnvelopeError::for_ticker(&run.ticker, &error)),
        }
    }

    let data = json!({
        "source": source.name(),
        "scorer": pipeline.scorer_name(),
        "start": format_date(window.range.start),
        "end": format_date(window.range.end),
        "results": results,
    });

    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_errors(errors))
}
