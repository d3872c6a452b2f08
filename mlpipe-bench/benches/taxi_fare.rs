use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use mlpipe_bench::taxi::{synthetic_trips, write_trips, BATCH_SIZES};
use mlpipe_bench::{BenchConfig, TaxiFareBench};

fn taxi_fare(c: &mut Criterion) {
    let config = BenchConfig::default();
    let dir = tempfile::tempdir().unwrap();
    let train_path = dir.path().join("taxi-fare-train.csv");
    let test_path = dir.path().join("taxi-fare-test.csv");
    write_trips(&train_path, &synthetic_trips(config.train_rows, config.seed)).unwrap();
    write_trips(&test_path, &synthetic_trips(config.test_rows, config.seed + 1)).unwrap();

    let bench = TaxiFareBench::setup(&train_path, &test_path, config.regressor.clone()).unwrap();

    let mut group = c.benchmark_group("taxi_fare");
    group.sample_size(10);
    group.bench_function("train", |b| b.iter(|| black_box(bench.train().unwrap())));
    group.finish();

    c.bench_function("taxi_fare/predict", |b| b.iter(|| black_box(bench.predict().unwrap())));

    let mut group = c.benchmark_group("taxi_fare/predict_batch");
    for (index, size) in BATCH_SIZES.iter().enumerate() {
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, &index| {
            b.iter(|| black_box(bench.predict_batch(index).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, taxi_fare);
criterion_main!(benches);
