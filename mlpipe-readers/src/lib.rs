//! Loader implementations for typed learning pipelines
//!
//! Loaders produce positional rows for a record type; the schema binder in
//! `mlpipe-core` turns them into columns.

#![warn(missing_docs)]

mod error;
pub mod memory;

#[cfg(feature = "csv")]
pub mod text;

pub use error::{Error, Result};
pub use memory::MemoryLoader;

#[cfg(feature = "csv")]
pub use text::{TextLoader, TextLoaderOptions};

// Re-export core types
pub use mlpipe_core::{Loader, RecordSchema, Row, Value};
