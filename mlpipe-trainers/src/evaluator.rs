//! Regression metrics over a scored store

use mlpipe_core::{ColumnStore, Error, Evaluator, Metrics, Result, Scorer};

const NAME: &str = "RegressionEvaluator";

/// Reports `l1`, `l2`, `rms` and `r_squared` of a scorer's predictions
/// against its label column
///
/// Rows whose label is `NaN` are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegressionEvaluator;

impl RegressionEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Compute the metrics for paired labels and scores
    pub fn metrics(labels: &[f32], scores: &[f32]) -> Result<Metrics> {
        if labels.len() != scores.len() {
            return Err(Error::schema_general(
                NAME,
                format!("{} labels for {} scores", labels.len(), scores.len()),
            ));
        }

        let pairs: Vec<(f64, f64)> = labels
            .iter()
            .zip(scores)
            .filter(|(label, _)| !label.is_nan())
            .map(|(&label, &score)| (f64::from(label), f64::from(score)))
            .collect();
        if pairs.is_empty() {
            return Err(Error::schema_general(NAME, "no labelled rows to evaluate"));
        }

        let n = pairs.len() as f64;
        let l1 = pairs.iter().map(|(label, score)| (label - score).abs()).sum::<f64>() / n;
        let l2 = pairs.iter().map(|(label, score)| (label - score).powi(2)).sum::<f64>() / n;
        let mean = pairs.iter().map(|(label, _)| label).sum::<f64>() / n;
        let variance = pairs.iter().map(|(label, _)| (label - mean).powi(2)).sum::<f64>() / n;
        // Constant labels leave nothing to explain
        let r_squared = if variance > 0.0 { 1.0 - l2 / variance } else { 0.0 };

        let mut metrics = Metrics::new();
        metrics.insert("l1", l1);
        metrics.insert("l2", l2);
        metrics.insert("rms", l2.sqrt());
        metrics.insert("r_squared", r_squared);
        Ok(metrics)
    }
}

impl Evaluator for RegressionEvaluator {
    fn evaluate(&self, model: &dyn Scorer, data: ColumnStore) -> Result<Metrics> {
        let scored = model.score(data)?;
        let labels = numeric(&scored, model.label_column())?;
        let scores = numeric(&scored, model.score_column())?;
        let metrics = Self::metrics(labels, scores)?;
        tracing::info!(rows = scored.row_count(), %metrics, "Evaluated regression");
        Ok(metrics)
    }
}

fn numeric<'a>(store: &'a ColumnStore, column: &str) -> Result<&'a [f32]> {
    let source = store.require(NAME, column)?;
    source.as_numeric().ok_or_else(|| {
        Error::schema(
            NAME,
            column,
            format!("expected a Numeric column, found {}", source.data_type()),
        )
    })
}
