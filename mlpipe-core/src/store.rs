//! Column store: the evolving set of named columns shared by the stages of
//! one pipeline execution

use std::collections::HashMap;

use crate::column::Column;
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};

const STAGE: &str = "ColumnStore";

/// How [`ColumnStore::append`] treats an existing column with the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Reject duplicate names
    Fail,

    /// Overwrite the existing column, keeping its ordinal position
    Replace,
}

/// A collection of equally long, uniquely named columns
///
/// Columns are only ever appended or replaced whole; there are no partial
/// in-place row edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStore {
    /// Columns in ordinal order
    columns: Vec<Column>,

    /// Column indices by name
    indices: HashMap<String, usize>,

    /// Number of rows every column must have
    row_count: usize,
}

impl ColumnStore {
    /// Create an empty store for `row_count` rows
    pub fn new(row_count: usize) -> Self {
        Self {
            columns: Vec::new(),
            indices: HashMap::new(),
            row_count,
        }
    }

    /// Create a store from columns, rejecting duplicate names and
    /// mismatched lengths
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut store = Self::new(row_count);
        for column in columns {
            store.append(column, AppendMode::Fail)?;
        }
        Ok(store)
    }

    /// Append a column
    ///
    /// Fails with a schema error on a duplicate name under [`AppendMode::Fail`]
    /// and with a shape error when the column length differs from the
    /// store's row count.
    pub fn append(&mut self, column: Column, mode: AppendMode) -> Result<()> {
        if column.len() != self.row_count {
            return Err(Error::Shape {
                stage: STAGE.to_string(),
                column: column.name().to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }

        match (self.indices.get(column.name()), mode) {
            (Some(_), AppendMode::Fail) => Err(Error::schema(
                STAGE,
                column.name(),
                "a column with this name already exists",
            )),
            (Some(&index), AppendMode::Replace) => {
                self.columns[index] = column;
                Ok(())
            }
            (None, _) => {
                self.indices.insert(column.name().to_string(), self.columns.len());
                self.columns.push(column);
                Ok(())
            }
        }
    }

    /// Get a column by name
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.indices.get(name).map(|&i| &self.columns[i])
    }

    /// Get a column a stage depends on, failing with a schema error naming
    /// the stage and the column
    pub fn require(&self, stage: &str, name: &str) -> Result<&Column> {
        self.get(name)
            .ok_or_else(|| Error::schema(stage, name, "column is missing from the store"))
    }

    /// Ordinal position of a column
    pub fn ordinal(&self, name: &str) -> Option<usize> {
        self.indices.get(name).copied()
    }

    /// Get the number of rows in this store
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of columns in this store
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if this store has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Iterate over columns in ordinal order
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Column names in ordinal order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Describe the columns of this store without their data
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name(), c.data_type()))
                .collect(),
        )
    }
}
