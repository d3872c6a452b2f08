//! Benchmarks for typed learning pipeline components
//!
//! [`run_benchmark`] times a closure the way the runner binary reports it;
//! the criterion benches in `benches/` cover the same cases with proper
//! statistics. Setups publish model quality metrics to the [`registry`] so
//! the report can show them next to the timings.

use std::hint::black_box;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use mlpipe_core::{Error, Result};
use mlpipe_trainers::TreeRegressorConfig;

pub mod registry;
pub mod report;
pub mod taxi;

pub use report::{render, MetricsColumn};
pub use taxi::{FarePrediction, TaxiFareBench, TaxiTrip};

/// Benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of timed iterations
    pub iterations: usize,

    /// Warmup iterations
    pub warmup_iterations: usize,

    /// Rows of synthetic training data
    pub train_rows: usize,

    /// Rows of synthetic held-out data
    pub test_rows: usize,

    /// Seed of the synthetic data
    pub seed: u64,

    /// Directory for the generated data files; a temporary one when unset
    pub data_dir: Option<PathBuf>,

    /// Regressor configuration
    pub regressor: TreeRegressorConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warmup_iterations: 3,
            train_rows: 2000,
            test_rows: 500,
            seed: 0,
            data_dir: None,
            regressor: TreeRegressorConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Name of the benchmark
    pub name: String,

    /// Number of timed iterations
    pub iterations: usize,

    /// Total time taken
    pub total_time: Duration,

    /// Average time per iteration
    pub avg_time: Duration,

    /// Min time per iteration
    pub min_time: Duration,

    /// Max time per iteration
    pub max_time: Duration,

    /// Throughput (rows/second)
    pub throughput: f64,
}

/// Run a benchmark, stopping at the first failing iteration
///
/// `rows` is the number of rows one call of `func` processes and only
/// feeds the throughput figure.
pub fn run_benchmark<T, F>(name: &str, config: &BenchConfig, rows: usize, mut func: F) -> Result<BenchResult>
where
    F: FnMut() -> Result<T>,
{
    if config.iterations == 0 {
        return Err(Error::schema_general("Bench", format!("'{name}' needs at least one iteration")));
    }

    // Warmup
    for _ in 0..config.warmup_iterations {
        black_box(func()?);
    }

    let mut times = Vec::with_capacity(config.iterations);
    let start_total = Instant::now();
    for _ in 0..config.iterations {
        let start = Instant::now();
        black_box(func()?);
        times.push(start.elapsed());
    }
    let total_time = start_total.elapsed();

    let avg_time = times.iter().sum::<Duration>() / times.len() as u32;
    let min_time = times.iter().min().copied().unwrap_or_default();
    let max_time = times.iter().max().copied().unwrap_or_default();
    let total_rows = config.iterations * rows;
    let throughput = total_rows as f64 / total_time.as_secs_f64().max(f64::EPSILON);

    tracing::debug!(benchmark = name, ?avg_time, throughput, "Finished benchmark");

    Ok(BenchResult {
        name: name.to_string(),
        iterations: config.iterations,
        total_time,
        avg_time,
        min_time,
        max_time,
        throughput,
    })
}

/// Run every taxi fare benchmark against prepared data files
pub fn bench_taxi_fare(config: &BenchConfig, bench: &TaxiFareBench) -> Result<Vec<BenchResult>> {
    let mut results = vec![
        run_benchmark("Train", config, config.train_rows, || bench.train())?,
        run_benchmark("Predict", config, 1, || bench.predict())?,
    ];
    for (index, size) in taxi::BATCH_SIZES.iter().enumerate() {
        results.push(run_benchmark(
            &format!("PredictBatchOf{size}"),
            config,
            *size,
            || bench.predict_batch(index),
        )?);
    }
    Ok(results)
}
