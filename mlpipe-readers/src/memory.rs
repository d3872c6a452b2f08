//! In-memory loader

use mlpipe_core::{Error, InputRecord, Loader, RecordSchema, Result, Row, SchemaBinder};

/// Serves rows that are already in memory
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    record: Option<String>,
    rows: Vec<Row>,
}

impl MemoryLoader {
    /// Lay out typed records as positional rows
    ///
    /// The loader only serves the record type it was built from.
    pub fn from_records<I: InputRecord>(records: &[I]) -> Result<Self> {
        let binder = SchemaBinder::for_record::<I>()?;
        let rows = records
            .iter()
            .map(|record| binder.row_from_values(record.values()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            record: Some(binder.record().to_string()),
            rows,
        })
    }

    /// Serve raw positional rows to any record type
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { record: None, rows }
    }

    /// Number of rows held
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows are held
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Loader for MemoryLoader {
    fn describe(&self) -> String {
        match &self.record {
            Some(record) => format!("<{} in memory>", record),
            None => "<rows in memory>".to_string(),
        }
    }

    fn load(&self, schema: &RecordSchema) -> Result<Vec<Row>> {
        if let Some(record) = &self.record {
            if record != schema.record() {
                return Err(Error::load(
                    self.describe(),
                    format!("holds '{}' records but '{}' were requested", record, schema.record()),
                ));
            }
        }
        Ok(self.rows.clone())
    }

    fn row_count_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}
