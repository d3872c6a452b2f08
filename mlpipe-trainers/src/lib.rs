//! Reference trainers and evaluators for typed learning pipelines
//!
//! [`TreeRegressor`] fits gradient-boosted regression trees against a
//! feature vector column and a numeric label column.
//! [`RegressionEvaluator`] scores a labelled store through any
//! [`mlpipe_core::Scorer`] and reports the usual regression losses.
//!
//! # Features
//!
//! - `parallel`: search split candidates of different features with rayon

#![warn(missing_docs)]

pub mod evaluator;
pub mod regressor;
mod tree;

pub use evaluator::RegressionEvaluator;
pub use regressor::{BoostedTrees, TreeRegressor, TreeRegressorConfig};
