//! Column transforms for typed learning pipelines
//!
//! Every transform here implements [`mlpipe_core::Transform`]. Fitting
//! produces an immutable [`mlpipe_core::FittedTransform`] that a trained
//! model applies to every scoring request.
//!
//! # Features
//!
//! - `parallel`: shard vocabulary scans across threads with rayon

#![warn(missing_docs)]

pub mod categorical;
pub mod concat;
pub mod copier;

pub use categorical::{FittedVectorizer, OneHotVectorizer, UnknownPolicy, Vocabulary};
pub use concat::{ColumnConcatenator, FittedConcatenator};
pub use copier::ColumnCopier;
