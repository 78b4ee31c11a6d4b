use almanac_core::{format_date, CalendarEffect, Pipeline, PipelineConfig, QuoteSource};
use serde_json::json;

use crate::cli::CalendarArgs;
use crate::envelope::EnvelopeError;
use crate::error::CliError;

use super::{CommandResult, Window};

pub fn run(
    args: &CalendarArgs,
    mut config: PipelineConfig,
    source: &dyn QuoteSource,
) -> Result<CommandResult, CliError> {
    let window = Window::parse(&args.window, &mut config)?;
    let effect = CalendarEffect::from(args.effect);
    let pipeline = Pipeline::new(config);

    let mut results = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    for run in pipeline.run_calendar_batch(source, &window.tickers, &window.range, effect.rule()) {
        match run.result {
            Ok(report) => {
                for cohort in [&report.in_period, &report.out_of_period] {
                    warnings.extend(
                        cohort
                            .warnings
                            .iter()
                            .map(|warning| format!("{}: {warning}", report.ticker)),
                    );
                }
                if report.in_period.rows == 0 {
                    warnings.push(format!(
                        "{}: no bars fall inside the {effect} period",
                        report.ticker
                    ));
                }
                results.push(json!({
                    "ticker": report.ticker,
                    "rate_difference": report.rate_difference(),
                    "in_period": report.in_period,
                    "out_of_period": report.out_of_period,
                }));
            }
            Err(error) => errors.push(EnvelopeError::for_ticker(&run.ticker, &error)),
        }
    }

    let data = json!({
        "source": source.name(),
        "scorer": pipeline.scorer_name(),
        "effect": effect,
        "rule": effect.rule(),
        "start": format_date(window.range.start),
        "end": format_date(window.range.end),
        "results": results,
    });

    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_errors(errors))
}
