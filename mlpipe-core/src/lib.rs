//! Core traits, data structures, and abstractions for typed learning pipelines
//!
//! This crate provides the foundational components for building pipelines
//! that bind typed records to columnar storage, run fitted transforms over
//! the columns and train a predictor at the end. It defines the core traits
//! and interfaces that the loader, transform and trainer crates build upon.

#![warn(missing_docs)]

pub mod binder;
pub mod column;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod store;
pub mod trainer;
pub mod transform;

// Re-export key types for convenience
pub use binder::{
    ColumnId, FieldBinding, FieldKind, InputRecord, OutputBinder, OutputRecord, RecordSchema, Row,
    SchemaBinder, ValueReader,
};
pub use column::{Column, ColumnData, Value};
pub use error::{Error, Result};
pub use evaluate::{Evaluator, Metrics, Scorer};
pub use model::TrainedModel;
pub use pipeline::{Pipeline, PipelineBuilder, Unvalidated, Validated};
pub use schema::{DataType, Field, Schema};
pub use source::Loader;
pub use store::{AppendMode, ColumnStore};
pub use trainer::{Predictor, Trainer, SCORE_COLUMN};
pub use transform::{FittedChain, FittedTransform, Transform};
