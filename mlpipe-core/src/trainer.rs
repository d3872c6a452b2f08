//! Terminal trainer stage and the predictors it produces

use std::fmt::Debug;
use std::sync::Arc;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::schema::{DataType, Schema};
use crate::store::{AppendMode, ColumnStore};

/// Default name of the column predictors write their scores to
pub const SCORE_COLUMN: &str = "Score";

/// The terminal stage of a pipeline: fits a predictor against a feature
/// column and a label column
pub trait Trainer: Debug + Send + Sync {
    /// Stage name used in errors and logs
    fn name(&self) -> &str;

    /// Column holding the feature vectors (or a single numeric feature)
    fn feature_column(&self) -> &str;

    /// Column holding the numeric labels
    fn label_column(&self) -> &str;

    /// Column the fitted predictor writes its scores to; must match
    /// [`Predictor::score_column`]
    fn score_column(&self) -> &str {
        SCORE_COLUMN
    }

    /// Fit a predictor; failures are reported as training errors
    fn train(&self, features: &Column, label: &Column) -> Result<Arc<dyn Predictor>>;

    /// Check that the schema after all transforms provides numeric feature
    /// and label columns
    fn validate(&self, schema: &Schema) -> Result<()> {
        for column in [self.feature_column(), self.label_column()] {
            let field = schema.require(self.name(), column)?;
            if !field.data_type().is_numeric() {
                return Err(Error::schema(
                    self.name(),
                    column,
                    format!("trainer needs a numeric column, found {}", field.data_type()),
                ));
            }
        }
        if let DataType::Vector(_) = schema.require(self.name(), self.label_column())?.data_type() {
            return Err(Error::schema(self.name(), self.label_column(), "label must be a scalar column"));
        }
        Ok(())
    }
}

/// A fitted model that scores feature vectors
pub trait Predictor: Debug + Send + Sync {
    /// Column the scores are written to
    fn score_column(&self) -> &str {
        SCORE_COLUMN
    }

    /// Number of float slots the predictor expects per row
    fn feature_width(&self) -> usize;

    /// Score every row of the feature column; the result has one value per
    /// row, in row order
    fn predict(&self, features: &Column) -> Result<Vec<f32>>;

    /// Score the store's feature column and write the score column
    fn apply(&self, feature_column: &str, store: &mut ColumnStore) -> Result<()> {
        let features = store.require("Predictor", feature_column)?;
        let scores = self.predict(features)?;
        store.append(Column::numeric(self.score_column(), scores), AppendMode::Replace)
    }
}
