//! Benchmark runner for the taxi fare scenario
//!
//! Usage: `mlpipe-bench [config.json]`. Set `RUST_LOG` to see pipeline logs.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use mlpipe_bench::taxi::{synthetic_trips, write_trips, RMS_METRIC};
use mlpipe_bench::{bench_taxi_fare, registry, render, BenchConfig, MetricsColumn, TaxiFareBench};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    registry::clear();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            BenchConfig::from_json(&json).with_context(|| format!("parsing {path}"))?
        }
        None => BenchConfig::default(),
    };

    // The scratch directory lives until the end of main
    let scratch = tempfile::tempdir().context("creating a scratch directory")?;
    let data_dir = config.data_dir.clone().unwrap_or_else(|| scratch.path().to_path_buf());
    std::fs::create_dir_all(&data_dir).with_context(|| format!("creating {}", data_dir.display()))?;
    let train_path = data_dir.join("taxi-fare-train.csv");
    let test_path = data_dir.join("taxi-fare-test.csv");
    write_trips(&train_path, &synthetic_trips(config.train_rows, config.seed))?;
    write_trips(&test_path, &synthetic_trips(config.test_rows, config.seed.wrapping_add(1)))?;

    println!("=== Taxi Fare Benchmarks ===");
    let bench = TaxiFareBench::setup(&train_path, &test_path, config.regressor.clone())
        .context("setting up the taxi fare benchmark")?;
    let results = bench_taxi_fare(&config, &bench)?;

    let columns = [MetricsColumn::new(RMS_METRIC, "Root mean squared error of the model on held-out trips")];
    println!("{}", render(&results, &columns));

    Ok(())
}
