//! Schema definitions for column stores

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit floating point scalar
    Numeric,

    /// UTF-8 text token (categorical values)
    Text,

    /// Fixed-width vector of 32-bit floats; the width is `None` until a
    /// fitted stage has decided it
    Vector(Option<usize>),
}

impl DataType {
    /// Check if this type can feed a numeric consumer (concatenation, training)
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Numeric | DataType::Vector(_))
    }

    /// Number of float slots one row of this type occupies, if known
    pub fn width(&self) -> Option<usize> {
        match self {
            DataType::Numeric => Some(1),
            DataType::Text => None,
            DataType::Vector(width) => *width,
        }
    }

    /// Check if this type is compatible with another type
    pub fn compatible_with(&self, other: &DataType) -> bool {
        match (self, other) {
            (DataType::Vector(a), DataType::Vector(b)) => match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            },
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Numeric => write!(f, "Numeric"),
            DataType::Text => write!(f, "Text"),
            DataType::Vector(Some(width)) => write!(f, "Vector({width})"),
            DataType::Vector(None) => write!(f, "Vector(?)"),
        }
    }
}

/// A field in a schema, with a name and data type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Name of the field
    pub name: String,

    /// Data type of the field
    pub data_type: DataType,
}

impl Field {
    /// Create a new field
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
        }
    }

    /// Get the name of this field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the data type of this field
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

/// The ordered set of columns a store holds at some point of a pipeline,
/// without any data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    /// Fields in this schema
    fields: Vec<Field>,

    /// Field indices by name for faster lookup
    field_indices: HashMap<String, usize>,
}

impl Schema {
    /// Create a new schema with the given fields
    ///
    /// Later fields with a duplicate name replace earlier ones, matching
    /// replace semantics of the column store.
    pub fn new(fields: Vec<Field>) -> Self {
        let mut schema = Self::default();
        for field in fields {
            schema.upsert(field);
        }
        schema
    }

    /// Get all fields in this schema
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by name
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.field_indices.get(name).map(|&i| &self.fields[i])
    }

    /// Check whether a column with the given name exists
    pub fn contains(&self, name: &str) -> bool {
        self.field_indices.contains_key(name)
    }

    /// Look up a column a stage needs, failing with a schema error naming
    /// the stage and the missing column
    pub fn require(&self, stage: &str, name: &str) -> Result<&Field> {
        self.field_by_name(name).ok_or_else(|| {
            Error::schema(
                stage,
                name,
                format!("required column is not produced by any preceding stage (available: {})", self.names().join(", ")),
            )
        })
    }

    /// Insert a field, replacing a same-named field in place
    pub fn upsert(&mut self, field: Field) {
        if let Some(&index) = self.field_indices.get(&field.name) {
            self.fields[index] = field;
        } else {
            self.field_indices.insert(field.name.clone(), self.fields.len());
            self.fields.push(field);
        }
    }

    /// Column names in ordinal order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Get the number of fields in this schema
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this schema is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema: {} fields", self.fields.len())?;
        for field in &self.fields {
            writeln!(f, "  {field}")?;
        }
        Ok(())
    }
}
