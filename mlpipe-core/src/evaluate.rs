//! Evaluation of trained models against held-out data

use std::fmt;

use crate::error::Result;
use crate::store::ColumnStore;

/// Anything that can replay a fitted pipeline over an already-bound store
pub trait Scorer: Send + Sync {
    /// Run every fitted stage and the predictor, returning the extended store
    fn score(&self, store: ColumnStore) -> Result<ColumnStore>;

    /// Column the predictor writes
    fn score_column(&self) -> &str;

    /// Column the predictor was trained against
    fn label_column(&self) -> &str;
}

/// Named scalar metrics, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    values: Vec<(String, f64)>,
}

impl Metrics {
    /// Create an empty metric set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a metric, replacing an earlier value with the same name
    pub fn insert(&mut self, name: &str, value: f64) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    /// Get a metric by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Iterate over metrics in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Number of metrics
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no metric was recorded
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value:.6}")?;
        }
        Ok(())
    }
}

/// Computes metrics for a scorer on held-out data
pub trait Evaluator {
    /// Score `data` with `model` and summarize the result
    fn evaluate(&self, model: &dyn Scorer, data: ColumnStore) -> Result<Metrics>;
}
