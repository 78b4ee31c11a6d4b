use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use almanac_core::{
    clean, engineer, select, AnomalyScorer, BarsRequest, DateRange, FeatureMatrix,
    IsolationForestScorer, QuoteSource, ScorerConfig, ScorerGrid, SelectionTarget,
    SyntheticSource, Ticker,
};

fn matrix(end: &str) -> FeatureMatrix {
    let request = BarsRequest::new(
        Ticker::parse("BENCH").expect("ticker"),
        DateRange::parse("2015-01-01", end).expect("range"),
    );
    let raw = SyntheticSource::new(3).bars(&request).expect("bars");
    engineer(&clean(&raw).expect("clean")).expect("features")
}

fn bench_isolation_forest_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("isolation_forest_fit");
    let scorer = IsolationForestScorer::default();

    for (label, end) in [("1y", "2015-12-31"), ("5y", "2019-12-31")] {
        let matrix = matrix(end);
        for estimators in [50, 200] {
            let config = ScorerConfig::new(estimators, 0.01).expect("config");
            group.bench_with_input(
                BenchmarkId::new(label, estimators),
                &matrix,
                |b, matrix| {
                    b.iter(|| {
                        let fitted = scorer.fit(black_box(matrix), config).expect("fit");
                        black_box(fitted.predict(matrix).expect("predict"));
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);
    let scorer = IsolationForestScorer::default();
    let grid = ScorerGrid::default();
    let matrix = matrix("2016-12-31");

    group.bench_function("default_grid_2y", |b| {
        b.iter(|| {
            black_box(
                select(&scorer, black_box(&matrix), &grid, SelectionTarget::SelfConsistency)
                    .expect("select"),
            );
        });
    });

    group.finish();
}

criterion_group!(benches, bench_isolation_forest_fit, bench_grid_search);
criterion_main!(benches);
