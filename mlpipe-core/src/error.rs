//! Error types for learning pipelines

use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// Column identity collisions, missing columns, kind mismatches and
    /// unknown-category misconfiguration
    #[error("Schema error in {stage}{}: {message}", column_suffix(.column))]
    Schema {
        /// Stage (binder, transform or trainer) that detected the problem
        stage: String,
        /// Offending column, when one can be named
        column: Option<String>,
        /// Human readable description
        message: String,
    },

    /// Row-count mismatch between columns of one store
    #[error("Shape error in {stage} for column '{column}': expected {expected} rows, got {actual}")]
    Shape {
        /// Stage that attempted the write
        stage: String,
        /// Column being written
        column: String,
        /// Row count of the store
        expected: usize,
        /// Row count of the rejected column
        actual: usize,
    },

    /// The terminal trainer failed to fit a predictor
    #[error("Training error in {stage}: {message}")]
    Training {
        /// Trainer name
        stage: String,
        /// Failure reported by the trainer
        message: String,
    },

    /// A loader could not produce rows
    #[error("Load error from {source_name}: {message}")]
    Load {
        /// Path or description of the data source
        source_name: String,
        /// Failure description
        message: String,
    },

    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(column) => format!(" (column '{column}')"),
        None => String::new(),
    }
}

impl Error {
    /// Build a schema error that names a column
    pub fn schema(stage: impl Into<String>, column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            stage: stage.into(),
            column: Some(column.into()),
            message: message.into(),
        }
    }

    /// Build a schema error that is not tied to one column
    pub fn schema_general(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema {
            stage: stage.into(),
            column: None,
            message: message.into(),
        }
    }

    /// Build a training error
    pub fn training(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Training {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Build a load error
    pub fn load(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Load {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// The column named by this error, if any
    pub fn column(&self) -> Option<&str> {
        match self {
            Error::Schema { column, .. } => column.as_deref(),
            Error::Shape { column, .. } => Some(column),
            _ => None,
        }
    }

    /// The stage that reported this error, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            Error::Schema { stage, .. } | Error::Shape { stage, .. } | Error::Training { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display_names_column() {
        let err = Error::schema("ColumnConcatenator", "TripDistanse", "column not found");
        assert_eq!(
            err.to_string(),
            "Schema error in ColumnConcatenator (column 'TripDistanse'): column not found"
        );
        assert_eq!(err.column(), Some("TripDistanse"));
        assert_eq!(err.stage(), Some("ColumnConcatenator"));
    }

    #[test]
    fn test_general_schema_error_has_no_column() {
        let err = Error::schema_general("SchemaBinder", "empty record type");
        assert_eq!(err.to_string(), "Schema error in SchemaBinder: empty record type");
        assert_eq!(err.column(), None);
    }

    #[test]
    fn test_shape_error_display() {
        let err = Error::Shape {
            stage: "ColumnStore".into(),
            column: "Label".into(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Shape error in ColumnStore for column 'Label': expected 3 rows, got 2"
        );
    }
}
