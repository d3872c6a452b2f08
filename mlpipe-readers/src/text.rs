//! Delimited text loader

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use mlpipe_core::{FieldKind, Loader, RecordSchema, Row, Value};

use crate::error::{Error, Result};

/// Options for [`TextLoader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLoaderOptions {
    /// Whether the first line is a header to skip
    pub has_header: bool,

    /// Field separator
    pub separator: u8,

    /// Whether to trim whitespace around cells
    pub trim: bool,

    /// Separator between the slots of a vector cell
    pub vector_separator: char,
}

impl Default for TextLoaderOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            separator: b',',
            trim: true,
            vector_separator: ' ',
        }
    }
}

#[derive(Debug, Clone)]
enum TextSource {
    File(PathBuf),
    Memory(String),
}

/// Reads delimited text (comma separated by default) into positional rows
///
/// Each cell is converted to the kind of the record field bound to its
/// position. Cells no field binds are kept as text, and empty cells become
/// [`Value::Missing`].
#[derive(Debug, Clone)]
pub struct TextLoader {
    source: TextSource,
    options: TextLoaderOptions,
}

impl TextLoader {
    /// Load from a file, read again on every [`Loader::load`]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            source: TextSource::File(path.as_ref().to_path_buf()),
            options: TextLoaderOptions::default(),
        }
    }

    /// Load from text already in memory
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            source: TextSource::Memory(text.into()),
            options: TextLoaderOptions::default(),
        }
    }

    /// Drain a reader into memory and load from its contents
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(Self::from_text(text))
    }

    /// Replace the loader options
    #[must_use]
    pub fn with_options(mut self, options: TextLoaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options
    pub fn options(&self) -> &TextLoaderOptions {
        &self.options
    }

    /// Read and convert every row
    pub fn read_rows(&self, schema: &RecordSchema) -> Result<Vec<Row>> {
        let kinds = cell_kinds(schema);
        match &self.source {
            TextSource::File(path) => {
                let file = File::open(path)?;
                self.read_from(file, &kinds)
            }
            TextSource::Memory(text) => self.read_from(text.as_bytes(), &kinds),
        }
    }

    fn read_from<R: Read>(&self, input: R, kinds: &[Option<FieldKind>]) -> Result<Vec<Row>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.options.separator)
            .has_headers(self.options.has_header)
            .trim(if self.options.trim { Trim::All } else { Trim::None })
            .flexible(true)
            .from_reader(input);

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            let line = record.position().map_or(0, csv::Position::line);
            let row = record
                .iter()
                .enumerate()
                .map(|(column, cell)| self.convert(cell, kinds.get(column).copied().flatten(), line, column))
                .collect::<Result<Row>>()?;
            rows.push(row);
        }

        tracing::debug!(source = %self.describe(), rows = rows.len(), "Read delimited text");
        Ok(rows)
    }

    fn convert(&self, cell: &str, kind: Option<FieldKind>, line: u64, column: usize) -> Result<Value> {
        if cell.is_empty() {
            return Ok(Value::Missing);
        }

        match kind {
            None | Some(FieldKind::Text) => Ok(Value::Text(cell.to_string())),
            Some(FieldKind::Numeric) => parse_float(cell)
                .map(Value::Numeric)
                .ok_or_else(|| self.format_error(line, column, format!("'{cell}' is not a number"))),
            Some(FieldKind::Vector) => cell
                .split(self.options.vector_separator)
                .filter(|slot| !slot.is_empty())
                .map(|slot| {
                    parse_float(slot).ok_or_else(|| {
                        self.format_error(line, column, format!("'{slot}' in vector cell is not a number"))
                    })
                })
                .collect::<Result<Vec<f32>>>()
                .map(Value::Vector),
        }
    }

    fn format_error(&self, line: u64, column: usize, message: String) -> Error {
        Error::Format {
            source_name: self.describe(),
            line,
            column,
            message,
        }
    }
}

impl Loader for TextLoader {
    fn describe(&self) -> String {
        match &self.source {
            TextSource::File(path) => path.display().to_string(),
            TextSource::Memory(_) => "<memory>".to_string(),
        }
    }

    fn load(&self, schema: &RecordSchema) -> mlpipe_core::Result<Vec<Row>> {
        Ok(self.read_rows(schema)?)
    }
}

fn parse_float(cell: &str) -> Option<f32> {
    cell.trim().parse::<f32>().ok()
}

/// Cell kinds by source position, from the index-bound fields of a record
fn cell_kinds(schema: &RecordSchema) -> Vec<Option<FieldKind>> {
    let mut kinds = Vec::new();
    for field in schema.input_fields() {
        if let Some(index) = field.source_index() {
            if kinds.len() <= index {
                kinds.resize(index + 1, None);
            }
            kinds[index] = Some(field.kind());
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use proptest::prelude::*;
    use test_case::test_case;

    fn schema() -> RecordSchema {
        RecordSchema::builder("Trip")
            .index("VendorId", 0, FieldKind::Text)
            .index("PassengerCount", 1, FieldKind::Numeric)
            .index("FareAmount", 3, FieldKind::Numeric)
            .build()
    }

    const TRIPS: &str = "vendor_id,passenger_count,notes,fare_amount\n\
                         VTS,1,quiet,12.5\n\
                         CMT,,late,8\n";

    #[test]
    fn test_cells_follow_bound_kinds() {
        let rows = TextLoader::from_text(TRIPS).load(&schema()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Text("VTS".to_string()));
        assert_eq!(rows[0][1], Value::Numeric(1.0));
        // Unbound cells stay text
        assert_eq!(rows[0][2], Value::Text("quiet".to_string()));
        assert_eq!(rows[0][3], Value::Numeric(12.5));
        assert_eq!(rows[1][1], Value::Missing);
    }

    #[test]
    fn test_reads_file_with_custom_separator() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "VTS;2;x;7.25\nCMT;1;y;5\n").unwrap();

        let loader = TextLoader::new(file.path()).with_options(TextLoaderOptions {
            has_header: false,
            separator: b';',
            ..TextLoaderOptions::default()
        });
        let rows = loader.load(&schema()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][3], Value::Numeric(5.0));
        assert_eq!(loader.describe(), file.path().display().to_string());
    }

    #[test_case("VTS,two,a,1\n", 1 ; "bad count")]
    #[test_case("VTS,2,a,1.0.0\n", 3 ; "bad fare")]
    fn test_parse_failure_reports_position(text: &str, column: usize) {
        let loader = TextLoader::from_text(text).with_options(TextLoaderOptions {
            has_header: false,
            ..TextLoaderOptions::default()
        });
        match loader.read_rows(&schema()).unwrap_err() {
            Error::Format { line, column: at, .. } => {
                assert_eq!(line, 1);
                assert_eq!(at, column);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_vector_cells() {
        let schema = RecordSchema::builder("Embedded")
            .index("Features", 0, FieldKind::Vector)
            .build();
        let loader = TextLoader::from_text("0.5 1 2\n").with_options(TextLoaderOptions {
            has_header: false,
            ..TextLoaderOptions::default()
        });
        let rows = loader.load(&schema).unwrap();
        assert_eq!(rows[0][0], Value::Vector(vec![0.5, 1.0, 2.0]));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TextLoader::new("/nonexistent/trips.csv").read_rows(&schema()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_reader() {
        let loader = TextLoader::from_reader(TRIPS.as_bytes()).unwrap();
        assert_eq!(loader.load(&schema()).unwrap().len(), 2);
        assert_eq!(loader.describe(), "<memory>");
    }

    proptest! {
        #[test]
        fn prop_numeric_cells_parse_exactly(fare in -1.0e6f32..1.0e6f32, vendor in "[A-Z]{1,3}") {
            let text = format!("{vendor},1,x,{fare}\n");
            let loader = TextLoader::from_text(text).with_options(TextLoaderOptions {
                has_header: false,
                ..TextLoaderOptions::default()
            });
            let rows = loader.read_rows(&schema()).unwrap();
            prop_assert_eq!(&rows[0][0], &Value::Text(vendor));
            prop_assert_eq!(&rows[0][3], &Value::Numeric(fare));
        }
    }
}
