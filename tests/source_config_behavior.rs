//! Behavior-driven tests for quote sources, batch runs and configuration
//!
//! These tests verify HOW bars are loaded from files or generated, that a
//! batch keeps going past a failing ticker, and that YAML config drives runs.

use std::sync::Arc;

use almanac_core::{
    format_date, BarsRequest, DateRange, JsonFileSource, Pipeline, PipelineConfig, PipelineError,
    QuoteSource, SourceErrorKind, SyntheticSource,
};
use almanac_tests::{ticker, FnScorer};
use tempfile::tempdir;

fn write_bars(dir: &std::path::Path, symbol: &str, closes: &[(&str, Option<f64>)]) {
    let bars: Vec<serde_json::Value> = closes
        .iter()
        .map(|(date, close)| {
            serde_json::json!({
                "date": date,
                "open": 10.0,
                "high": 11.0,
                "low": 9.0,
                "close": close,
                "volume": 1000.0,
            })
        })
        .collect();
    std::fs::write(
        dir.join(format!("{symbol}.json")),
        serde_json::to_string(&bars).expect("serialize"),
    )
    .expect("write bars");
}

// =============================================================================
// JSON file source
// =============================================================================

#[test]
fn when_bar_files_are_loaded_system_filters_sorts_and_keeps_gaps() {
    // Given: An unordered bar file with a gap and a row outside the window
    let dir = tempdir().expect("tempdir");
    write_bars(
        dir.path(),
        "AAPL",
        &[
            ("2021-01-06", Some(12.0)),
            ("2021-01-04", Some(10.0)),
            ("2021-01-05", None),
            ("2021-02-01", Some(99.0)),
        ],
    );
    let source = JsonFileSource::new(dir.path());
    let request = BarsRequest::new(
        ticker("AAPL"),
        DateRange::parse("2021-01-01", "2021-01-31").expect("range"),
    );

    // When: The bars are requested
    let series = source.bars(&request).expect("bars load");

    // Then: Only in-window rows remain, in date order, with the gap preserved
    let dates: Vec<String> = series.bars().iter().map(|bar| format_date(bar.date)).collect();
    assert_eq!(dates, vec!["2021-01-04", "2021-01-05", "2021-01-06"]);
    assert_eq!(series.bars()[1].close, None);
}

#[test]
fn when_one_ticker_has_no_file_system_reports_it_and_finishes_the_batch() {
    // Given: Bars on disk for AAPL only
    let dir = tempdir().expect("tempdir");
    let days: Vec<String> = (4..=29).map(|day| format!("2021-01-{day:02}")).collect();
    let closes: Vec<(&str, Option<f64>)> = days
        .iter()
        .enumerate()
        .map(|(i, day)| (day.as_str(), Some(10.0 + i as f64)))
        .collect();
    write_bars(dir.path(), "AAPL", &closes);
    let range = DateRange::parse("2021-01-01", "2021-01-31").expect("range");
    let pipeline =
        Pipeline::with_scorer(PipelineConfig::default(), Arc::new(FnScorer::close_above(30.0)));

    // When: A batch runs for AAPL, a missing ticker, and AAPL again
    let runs = pipeline.run_batch(
        &JsonFileSource::new(dir.path()),
        &[ticker("AAPL"), ticker("MISSING"), ticker("AAPL")],
        &range,
    );

    // Then: Results keep request order and only the missing ticker failed
    assert_eq!(runs.len(), 3);
    assert!(runs[0].result.is_ok());
    assert!(runs[2].result.is_ok());
    match &runs[1].result {
        Err(PipelineError::Source(error)) => {
            assert_eq!(error.kind(), SourceErrorKind::NotFound);
            assert_eq!(runs[1].ticker.as_str(), "MISSING");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

// =============================================================================
// Synthetic source
// =============================================================================

#[test]
fn when_the_same_synthetic_request_runs_twice_system_returns_identical_reports() {
    // Given: A seeded synthetic source and the default pipeline
    let source = SyntheticSource::new(21);
    let range = DateRange::parse("2022-01-01", "2022-06-30").expect("range");
    let pipeline = Pipeline::new(PipelineConfig::default());

    // When: The same ticker is run twice
    let first = pipeline.run_batch(&source, &[ticker("TSLA")], &range);
    let second = pipeline.run_batch(&source, &[ticker("TSLA")], &range);

    // Then: Both runs agree exactly
    let first = first[0].result.as_ref().expect("first run");
    let second = second[0].result.as_ref().expect("second run");
    assert_eq!(first, second);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn when_a_yaml_config_enables_selection_system_searches_its_grid() {
    // Given: A config file with a two-point grid and selection on
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("almanac.yaml");
    std::fs::write(
        &path,
        "select_model: true\nseed: 3\ngrid:\n  estimator_counts: [20]\n  contamination_fractions: [0.02, 0.04]\n",
    )
    .expect("write config");
    let config = PipelineConfig::from_path(&path).expect("config loads");

    // When: A synthetic series runs through the configured pipeline
    let range = DateRange::parse("2021-01-01", "2021-12-31").expect("range");
    let runs = Pipeline::new(config).run_batch(&SyntheticSource::new(3), &[ticker("NVDA")], &range);
    let report = runs[0].result.as_ref().expect("run succeeds");

    // Then: The selection covered exactly the configured grid
    let selection = report.selection.as_ref().expect("selection ran");
    assert_eq!(selection.grid.len(), 2);
    assert_eq!(report.config.estimator_count(), 20);
    assert!(!report.warnings.is_empty());
}
