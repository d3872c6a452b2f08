//! Column implementation for storing typed vectors of data

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::DataType;

/// A single cell value, as produced by loaders and consumed by records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit floating point scalar
    Numeric(f32),

    /// Text token
    Text(String),

    /// Fixed-width float vector
    Vector(Vec<f32>),

    /// Empty source cell; binds to `NaN` in numeric columns and to the empty
    /// string in text columns
    Missing,
}

impl Value {
    /// The data type this value naturally belongs to, if any
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Numeric(_) => Some(DataType::Numeric),
            Value::Text(_) => Some(DataType::Text),
            Value::Vector(values) => Some(DataType::Vector(Some(values.len()))),
            Value::Missing => None,
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Numeric(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<f32>> for Value {
    fn from(values: Vec<f32>) -> Self {
        Value::Vector(values)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Numeric(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Vector(values) => write!(f, "{values:?}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

/// Typed storage behind a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// One float per row
    Numeric(Vec<f32>),

    /// One text token per row
    Text(Vec<String>),

    /// `width` floats per row, row-major
    Vector {
        /// Number of slots per row
        width: usize,
        /// Flattened values, `rows * width` long
        values: Vec<f32>,
    },
}

/// A named column of data with a specific type
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name of the column
    name: String,

    /// The actual data values
    data: ColumnData,

    /// Number of logical values in this column
    length: usize,
}

impl Column {
    /// Create a numeric column
    pub fn numeric(name: &str, values: Vec<f32>) -> Self {
        Self {
            name: name.to_string(),
            length: values.len(),
            data: ColumnData::Numeric(values),
        }
    }

    /// Create a text column
    pub fn text<S: Into<String>>(name: &str, values: impl IntoIterator<Item = S>) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self {
            name: name.to_string(),
            length: values.len(),
            data: ColumnData::Text(values),
        }
    }

    /// Create a vector column from flattened row-major values
    pub fn vector(name: &str, width: usize, values: Vec<f32>) -> Result<Self> {
        let length = if width == 0 {
            0
        } else {
            if values.len() % width != 0 {
                return Err(Error::schema(
                    "Column",
                    name,
                    format!("{} values do not divide into rows of width {}", values.len(), width),
                ));
            }
            values.len() / width
        };

        Ok(Self {
            name: name.to_string(),
            data: ColumnData::Vector { width, values },
            length,
        })
    }

    /// Create a vector column of zero width with an explicit row count
    pub fn empty_vector(name: &str, rows: usize) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Vector { width: 0, values: Vec::new() },
            length: rows,
        }
    }

    /// Create an empty column of the given type, ready for [`Column::push`]
    pub fn with_capacity(name: &str, data_type: DataType, capacity: usize) -> Self {
        let data = match data_type {
            DataType::Numeric => ColumnData::Numeric(Vec::with_capacity(capacity)),
            DataType::Text => ColumnData::Text(Vec::with_capacity(capacity)),
            DataType::Vector(width) => {
                let width = width.unwrap_or(0);
                ColumnData::Vector {
                    width,
                    values: Vec::with_capacity(capacity * width),
                }
            }
        };

        Self {
            name: name.to_string(),
            data,
            length: 0,
        }
    }

    /// Append one value, converting `Missing` to the column's empty value
    pub fn push(&mut self, value: Value) -> Result<()> {
        let column_type = self.data_type();
        match (&mut self.data, value) {
            (ColumnData::Numeric(values), Value::Numeric(v)) => values.push(v),
            (ColumnData::Numeric(values), Value::Missing) => values.push(f32::NAN),
            (ColumnData::Text(values), Value::Text(v)) => values.push(v),
            (ColumnData::Text(values), Value::Missing) => values.push(String::new()),
            (ColumnData::Vector { width, values }, Value::Vector(v)) => {
                // Width is taken from the first vector; earlier missing rows are backfilled
                if *width == 0 && values.is_empty() && !v.is_empty() {
                    *width = v.len();
                    values.extend(std::iter::repeat(f32::NAN).take(self.length * v.len()));
                }
                if v.len() != *width {
                    return Err(Error::schema(
                        "Column",
                        self.name.as_str(),
                        format!("vector of width {} pushed into column of width {}", v.len(), width),
                    ));
                }
                values.extend_from_slice(&v);
            }
            (ColumnData::Vector { width, values }, Value::Missing) => {
                values.extend(std::iter::repeat(f32::NAN).take(*width));
            }
            (_, value) => {
                return Err(Error::schema(
                    "Column",
                    self.name.as_str(),
                    format!("cannot store {} value '{}' in {} column", kind_name(&value), value, column_type),
                ));
            }
        }

        self.length += 1;
        Ok(())
    }

    /// Get the name of this column
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return this column under a different name
    #[must_use]
    pub fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Get the data type of this column
    pub fn data_type(&self) -> DataType {
        match &self.data {
            ColumnData::Numeric(_) => DataType::Numeric,
            ColumnData::Text(_) => DataType::Text,
            ColumnData::Vector { width, .. } => DataType::Vector(Some(*width)),
        }
    }

    /// Get the length of this column (number of values)
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if this column is empty
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Access the typed storage
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of float slots per row (1 for numeric, vector width for
    /// vectors, `None` for text)
    pub fn width(&self) -> Option<usize> {
        self.data_type().width()
    }

    /// Numeric values, if this is a numeric column
    pub fn as_numeric(&self) -> Option<&[f32]> {
        match &self.data {
            ColumnData::Numeric(values) => Some(values),
            _ => None,
        }
    }

    /// Text values, if this is a text column
    pub fn as_text(&self) -> Option<&[String]> {
        match &self.data {
            ColumnData::Text(values) => Some(values),
            _ => None,
        }
    }

    /// Float slots of one row, for numeric and vector columns
    pub fn row_slice(&self, row: usize) -> Option<&[f32]> {
        if row >= self.length {
            return None;
        }
        match &self.data {
            ColumnData::Numeric(values) => Some(std::slice::from_ref(&values[row])),
            ColumnData::Vector { width, values } => Some(&values[row * width..(row + 1) * width]),
            ColumnData::Text(_) => None,
        }
    }

    /// Get a value by row index
    pub fn value(&self, row: usize) -> Option<Value> {
        if row >= self.length {
            return None;
        }
        Some(match &self.data {
            ColumnData::Numeric(values) => Value::Numeric(values[row]),
            ColumnData::Text(values) => Value::Text(values[row].clone()),
            ColumnData::Vector { width, values } => Value::Vector(values[row * width..(row + 1) * width].to_vec()),
        })
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Numeric(_) => "numeric",
        Value::Text(_) => "text",
        Value::Vector(_) => "vector",
        Value::Missing => "missing",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_converts_missing() {
        let mut numeric = Column::with_capacity("TripTime", DataType::Numeric, 2);
        numeric.push(Value::Numeric(30.0)).unwrap();
        numeric.push(Value::Missing).unwrap();
        assert_eq!(numeric.len(), 2);
        assert!(numeric.as_numeric().unwrap()[1].is_nan());

        let mut text = Column::with_capacity("VendorId", DataType::Text, 1);
        text.push(Value::Missing).unwrap();
        assert_eq!(text.as_text().unwrap(), &[String::new()]);
    }

    #[test]
    fn test_push_rejects_kind_mismatch() {
        let mut column = Column::with_capacity("PassengerCount", DataType::Numeric, 1);
        let err = column.push(Value::from("one")).unwrap_err();
        assert_eq!(err.column(), Some("PassengerCount"));
        assert!(column.is_empty());
    }

    #[test]
    fn test_vector_rows() {
        let column = Column::vector("Features", 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(column.len(), 2);
        assert_eq!(column.row_slice(1), Some(&[3.0, 4.0][..]));
        assert_eq!(column.value(0), Some(Value::Vector(vec![1.0, 2.0])));
        assert!(Column::vector("Features", 3, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_vector_width_resolves_after_leading_missing_rows() {
        let mut column = Column::with_capacity("Embedding", DataType::Vector(None), 3);
        column.push(Value::Missing).unwrap();
        column.push(Value::Missing).unwrap();
        column.push(Value::Vector(vec![1.0, 2.0])).unwrap();

        assert_eq!(column.data_type(), DataType::Vector(Some(2)));
        assert_eq!(column.len(), 3);
        assert!(column.row_slice(0).unwrap().iter().all(|v| v.is_nan()));
        assert!(column.row_slice(1).unwrap().iter().all(|v| v.is_nan()));
        assert_eq!(column.row_slice(2), Some(&[1.0, 2.0][..]));
        assert!(column.push(Value::Vector(vec![1.0])).is_err());
    }

    #[test]
    fn test_vector_push_sets_width_on_first_row() {
        let mut column = Column::with_capacity("Features", DataType::Vector(None), 2);
        column.push(Value::Vector(vec![1.0, 0.0, 0.0])).unwrap();
        assert_eq!(column.data_type(), DataType::Vector(Some(3)));
        assert!(column.push(Value::Vector(vec![1.0])).is_err());
    }
}
