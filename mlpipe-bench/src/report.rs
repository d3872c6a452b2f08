//! Plain-text benchmark reports

use std::fmt::Write;

use crate::registry;
use crate::BenchResult;

/// Extra report column showing one published metric
///
/// The value is looked up in the [`registry`] when the report is rendered;
/// a metric nobody published shows as `-`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsColumn {
    metric_name: String,
    legend: String,
}

impl MetricsColumn {
    /// Show `metric_name`, described by `legend` under the table
    pub fn new(metric_name: &str, legend: &str) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            legend: legend.to_string(),
        }
    }

    /// Column header, which is also the metric name
    pub fn name(&self) -> &str {
        &self.metric_name
    }

    /// One-line description of the metric
    pub fn legend(&self) -> &str {
        &self.legend
    }

    /// Rendered value of the metric
    pub fn value(&self) -> String {
        match registry::metric(&self.metric_name) {
            Some(value) => format!("{value:.4}"),
            None => "-".to_string(),
        }
    }
}

/// Render results as a table with one row per benchmark, followed by the
/// legends of the metric columns
pub fn render(results: &[BenchResult], columns: &[MetricsColumn]) -> String {
    let name_width = results
        .iter()
        .map(|result| result.name.len())
        .chain(std::iter::once("Benchmark".len()))
        .max()
        .unwrap_or_default();

    let mut out = String::new();
    let _ = write!(
        out,
        "{:<name_width$} | {:>12} | {:>12} | {:>12} | {:>14}",
        "Benchmark", "Mean", "Min", "Max", "Rows/sec"
    );
    for column in columns {
        let _ = write!(out, " | {:>10}", column.name());
    }
    out.push('\n');

    for result in results {
        let _ = write!(
            out,
            "{:<name_width$} | {:>12} | {:>12} | {:>12} | {:>14.2}",
            result.name,
            format!("{:?}", result.avg_time),
            format!("{:?}", result.min_time),
            format!("{:?}", result.max_time),
            result.throughput
        );
        for column in columns {
            let _ = write!(out, " | {:>10}", column.value());
        }
        out.push('\n');
    }

    if !columns.is_empty() {
        out.push('\n');
        for column in columns {
            let _ = writeln!(out, "  {}: {}", column.name(), column.legend());
        }
    }
    out
}
