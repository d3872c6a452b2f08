//! Error types for loaders

use thiserror::Error;

/// Error type for loaders
#[derive(Error, Debug)]
pub enum Error {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] mlpipe_core::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV format error
    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A cell could not be converted to the kind of the field bound to it
    #[error("Format error in {source_name} at line {line}, column {column}: {message}")]
    Format {
        /// Path or description of the source
        source_name: String,
        /// 1-based line number
        line: u64,
        /// 0-based source column index
        column: usize,
        /// What went wrong
        message: String,
    },
}

/// Result type for loaders
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for mlpipe_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::Io(inner) => mlpipe_core::Error::Io(inner),
            #[cfg(feature = "csv")]
            Error::Csv(inner) => mlpipe_core::Error::load("csv", inner.to_string()),
            Error::Format { ref source_name, .. } => mlpipe_core::Error::load(source_name.clone(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_converts_to_load_error() {
        let err = Error::Format {
            source_name: "taxi.csv".to_string(),
            line: 3,
            column: 2,
            message: "'two' is not a number".to_string(),
        };
        let core: mlpipe_core::Error = err.into();
        let text = core.to_string();
        assert!(text.contains("taxi.csv"));
        assert!(text.contains("line 3, column 2"));
    }

    #[test]
    fn test_core_error_passes_through() {
        let err = Error::from(mlpipe_core::Error::schema("Stage", "Col", "broken"));
        let core: mlpipe_core::Error = err.into();
        assert_eq!(core.column(), Some("Col"));
    }
}
