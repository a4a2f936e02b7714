//! Cardinal Estimator Benchmarks
//!
//! Measures feature extraction, model fitting and per-query estimation.
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- <name>

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use cardinal::features::{
    CardinalityFeatureExtractor, FeatureSchema, QueryFeatureExtractor, CARDINALITY_FEATURES,
};
use cardinal::{
    BoostingConfig, Estimator, EstimatorConfig, Filter, FilterQueryFeatures, Query, TableStats,
    TargetKind, TrainedModel,
};

fn bench_query(filters: usize) -> Query {
    (0..filters).fold(
        Query::new()
            .with_table_stats(TableStats::new(1_000_000, 20_000).with_index("col_0"))
            .with_join("orders")
            .with_aggregation("count"),
        |q, i| {
            let operator = if i % 2 == 0 { "=" } else { ">" };
            q.with_filter(Filter::new(format!("col_{i}"), operator, i as i64))
        },
    )
}

fn training_set(samples: usize) -> (FeatureSchema, Vec<Vec<f64>>, Vec<f64>) {
    let extractor = CardinalityFeatureExtractor::new();
    let schema = FeatureSchema::new(CARDINALITY_FEATURES.iter().map(|s| s.to_string()).collect())
        .expect("valid schema");
    let queries: Vec<Query> = (0..samples).map(|i| bench_query(i % 6)).collect();
    let rows = queries
        .iter()
        .map(|q| schema.align(&extractor.extract(q)))
        .collect();
    let observed = queries
        .iter()
        .map(|q| 500.0 * (q.filters.len() + 1) as f64)
        .collect();
    (schema, rows, observed)
}

// ============================================================================
// Feature Extraction Benchmarks
// ============================================================================

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");
    let extractor = CardinalityFeatureExtractor::new();

    for filters in [0, 4, 16].iter() {
        let query = bench_query(*filters);
        group.bench_with_input(BenchmarkId::new("cardinality", filters), filters, |b, _| {
            b.iter(|| black_box(extractor.extract(&query)))
        });
    }

    group.finish();
}

// ============================================================================
// Training Benchmarks
// ============================================================================

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);

    for samples in [500, 2_000].iter() {
        let (schema, rows, observed) = training_set(*samples);
        let config = BoostingConfig::default().with_n_estimators(20);

        group.throughput(Throughput::Elements(*samples as u64));
        group.bench_with_input(BenchmarkId::from_parameter(samples), samples, |b, _| {
            b.iter(|| {
                black_box(
                    TrainedModel::fit(
                        TargetKind::Cardinality,
                        config.clone(),
                        schema.clone(),
                        &rows,
                        &observed,
                    )
                    .expect("fit"),
                )
            })
        });
    }

    group.finish();
}

// ============================================================================
// Estimation Benchmarks
// ============================================================================

fn bench_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");
    let (schema, rows, observed) = training_set(1_000);
    let model = TrainedModel::fit(
        TargetKind::Cardinality,
        BoostingConfig::default(),
        schema,
        &rows,
        &observed,
    )
    .expect("fit");

    let fallback = Estimator::default();
    let learned = Estimator::with_model(EstimatorConfig::default(), model).expect("trained model");
    let query = bench_query(3);

    group.bench_function("fallback", |b| b.iter(|| black_box(fallback.estimate(&query))));
    group.bench_function("model", |b| b.iter(|| black_box(learned.estimate(&query))));

    let features = FilterQueryFeatures::new("color", "Equal");
    group.bench_function("selectivity_fallback", |b| {
        b.iter(|| black_box(fallback.estimate_selectivity(&features)))
    });

    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    name = benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(std::time::Duration::from_secs(5));
    targets =
        bench_extraction,
        bench_fit,
        bench_estimate,
);

criterion_main!(benches);
