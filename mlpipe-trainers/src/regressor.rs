//! Gradient-boosted regression trees

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mlpipe_core::{Column, Error, Predictor, Result, Trainer};

use crate::tree::{Features, GrowParams, RegressionTree};

const NAME: &str = "TreeRegressor";

/// Configuration for [`TreeRegressor`]
///
/// Missing fields take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeRegressorConfig {
    /// Number of boosting rounds
    pub num_trees: usize,

    /// Maximum number of leaves per tree
    pub num_leaves: usize,

    /// Optional depth limit on top of the leaf limit
    pub max_depth: Option<usize>,

    /// Shrinkage applied to every leaf value
    pub learning_rate: f32,

    /// Minimum number of training rows in a leaf
    pub min_samples_leaf: usize,
}

impl Default for TreeRegressorConfig {
    fn default() -> Self {
        Self {
            num_trees: 100,
            num_leaves: 20,
            max_depth: None,
            learning_rate: 0.2,
            min_samples_leaf: 10,
        }
    }
}

impl TreeRegressorConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| Error::training(NAME, format!("invalid configuration: {err}")))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.num_leaves < 1 {
            return Err(Error::training(NAME, "num_leaves must be at least 1"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::training(
                NAME,
                format!("learning_rate must be positive, got {}", self.learning_rate),
            ));
        }
        Ok(())
    }

    fn grow_params(&self) -> GrowParams {
        GrowParams {
            num_leaves: self.num_leaves,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            learning_rate: self.learning_rate,
        }
    }
}

/// Trains [`BoostedTrees`] on a feature vector column and a numeric label
///
/// Training is deterministic: the same rows in the same order always give
/// the same trees.
#[derive(Debug, Clone)]
pub struct TreeRegressor {
    config: TreeRegressorConfig,
    feature_column: String,
    label_column: String,
}

impl Default for TreeRegressor {
    fn default() -> Self {
        Self::new(TreeRegressorConfig::default())
    }
}

impl TreeRegressor {
    /// Train on the `Features` and `Label` columns
    pub fn new(config: TreeRegressorConfig) -> Self {
        Self {
            config,
            feature_column: "Features".to_string(),
            label_column: "Label".to_string(),
        }
    }

    /// Train on other columns
    #[must_use]
    pub fn with_columns(mut self, feature_column: &str, label_column: &str) -> Self {
        self.feature_column = feature_column.to_string();
        self.label_column = label_column.to_string();
        self
    }

    /// The configuration
    pub fn config(&self) -> &TreeRegressorConfig {
        &self.config
    }

    fn dense_features(features: &Column) -> Result<(Vec<f32>, usize)> {
        let width = features.width().ok_or_else(|| {
            Error::training(
                NAME,
                format!("feature column '{}' holds {} values", features.name(), features.data_type()),
            )
        })?;

        let mut values = Vec::with_capacity(features.len() * width);
        for row in 0..features.len() {
            values.extend_from_slice(features.row_slice(row).unwrap_or_default());
        }
        Ok((values, width))
    }
}

impl Trainer for TreeRegressor {
    fn name(&self) -> &str {
        NAME
    }

    fn feature_column(&self) -> &str {
        &self.feature_column
    }

    fn label_column(&self) -> &str {
        &self.label_column
    }

    fn train(&self, features: &Column, label: &Column) -> Result<Arc<dyn Predictor>> {
        self.config.check()?;

        let labels = label.as_numeric().ok_or_else(|| {
            Error::training(NAME, format!("label column '{}' is not numeric", label.name()))
        })?;
        if labels.is_empty() {
            return Err(Error::training(NAME, "no training rows"));
        }
        if features.len() != labels.len() {
            return Err(Error::training(
                NAME,
                format!("{} feature rows for {} labels", features.len(), labels.len()),
            ));
        }
        if let Some(row) = labels.iter().position(|value| !value.is_finite()) {
            return Err(Error::training(
                NAME,
                format!("label at row {row} is {}", labels[row]),
            ));
        }

        let (values, width) = Self::dense_features(features)?;
        let matrix = Features { values: &values, width };
        let params = self.config.grow_params();

        let base_score = (labels.iter().map(|&v| f64::from(v)).sum::<f64>() / labels.len() as f64) as f32;
        let mut predictions = vec![base_score; labels.len()];
        let mut residuals = vec![0.0_f32; labels.len()];
        let mut trees = Vec::with_capacity(self.config.num_trees);

        for round in 0..self.config.num_trees {
            for ((residual, label), prediction) in residuals.iter_mut().zip(labels).zip(&predictions) {
                *residual = label - prediction;
            }

            let tree = RegressionTree::grow(matrix, &residuals, &params);
            for (row, prediction) in predictions.iter_mut().enumerate() {
                *prediction += tree.predict(&values[row * width..(row + 1) * width]);
            }
            tracing::trace!(round, leaves = tree.num_leaves(), "Grew tree");
            trees.push(tree);
        }

        tracing::debug!(
            trees = trees.len(),
            rows = labels.len(),
            width,
            base_score,
            "Trained boosted trees"
        );

        Ok(Arc::new(BoostedTrees {
            base_score,
            trees,
            feature_width: width,
        }))
    }
}

/// A fitted ensemble: the label mean plus the sum of every tree's output
#[derive(Debug, Clone, PartialEq)]
pub struct BoostedTrees {
    base_score: f32,
    trees: Vec<RegressionTree>,
    feature_width: usize,
}

impl BoostedTrees {
    /// Score one feature row
    pub fn predict_row(&self, row: &[f32]) -> f32 {
        self.trees
            .iter()
            .fold(self.base_score, |score, tree| score + tree.predict(row))
    }

    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Starting score before any tree
    pub fn base_score(&self) -> f32 {
        self.base_score
    }
}

impl Predictor for BoostedTrees {
    fn feature_width(&self) -> usize {
        self.feature_width
    }

    fn predict(&self, features: &Column) -> Result<Vec<f32>> {
        if features.width() != Some(self.feature_width) {
            return Err(Error::schema(
                "BoostedTrees",
                features.name(),
                format!(
                    "expected {} feature slots per row, found {}",
                    self.feature_width,
                    features.data_type()
                ),
            ));
        }

        Ok((0..features.len())
            .map(|row| self.predict_row(features.row_slice(row).unwrap_or_default()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn small() -> TreeRegressor {
        TreeRegressor::new(TreeRegressorConfig {
            num_trees: 50,
            num_leaves: 4,
            min_samples_leaf: 1,
            learning_rate: 0.5,
            ..TreeRegressorConfig::default()
        })
    }

    fn linear_data() -> (Column, Column) {
        let xs: Vec<f32> = (0..40).map(|i| i as f32 / 4.0).collect();
        let ys: Vec<f32> = xs.iter().map(|x| 3.0 * x + 1.0).collect();
        (
            Column::vector("Features", 1, xs).unwrap(),
            Column::numeric("Label", ys),
        )
    }

    #[test]
    fn test_fits_training_data() {
        let (features, label) = linear_data();
        let predictor = small().train(&features, &label).unwrap();
        let scores = predictor.predict(&features).unwrap();

        let labels = label.as_numeric().unwrap();
        let mse: f32 = scores.iter().zip(labels).map(|(s, l)| (s - l).powi(2)).sum::<f32>() / scores.len() as f32;
        assert!(mse < 1.0, "mse too large: {mse}");
        assert_eq!(predictor.feature_width(), 1);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (features, label) = linear_data();
        let a = small().train(&features, &label).unwrap().predict(&features).unwrap();
        let b = small().train(&features, &label).unwrap().predict(&features).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_numeric_feature_column() {
        let features = Column::numeric("Features", vec![0.0, 0.0, 10.0, 10.0]);
        let label = Column::numeric("Label", vec![1.0, 1.0, 5.0, 5.0]);
        let predictor = small().train(&features, &label).unwrap();
        let scores = predictor.predict(&features).unwrap();
        assert!((scores[0] - 1.0).abs() < 0.01);
        assert!((scores[3] - 5.0).abs() < 0.01);
    }

    #[test_case(Column::numeric("Label", vec![]), Column::vector("Features", 1, vec![]).unwrap() ; "empty")]
    #[test_case(Column::numeric("Label", vec![1.0, f32::NAN]), Column::vector("Features", 1, vec![1.0, 2.0]).unwrap() ; "nan label")]
    #[test_case(Column::numeric("Label", vec![1.0]), Column::vector("Features", 1, vec![1.0, 2.0]).unwrap() ; "row mismatch")]
    #[test_case(Column::text("Label", ["a"]), Column::vector("Features", 1, vec![1.0]).unwrap() ; "text label")]
    fn test_training_errors(label: Column, features: Column) {
        let err = small().train(&features, &label).unwrap_err();
        assert!(matches!(err, Error::Training { .. }), "unexpected error: {err}");
    }

    #[test]
    fn test_predict_rejects_other_width() {
        let (features, label) = linear_data();
        let predictor = small().train(&features, &label).unwrap();
        let wide = Column::vector("Features", 2, vec![1.0, 2.0]).unwrap();
        let err = predictor.predict(&wide).unwrap_err();
        assert_eq!(err.column(), Some("Features"));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = TreeRegressorConfig::from_json(r#"{ "num_trees": 5, "learning_rate": 0.1 }"#).unwrap();
        assert_eq!(config.num_trees, 5);
        assert_eq!(config.num_leaves, TreeRegressorConfig::default().num_leaves);
        assert!(TreeRegressorConfig::from_json(r#"{ "learning_rate": -1.0 }"#).is_err());
        assert!(TreeRegressorConfig::from_json("not json").is_err());
    }
}
