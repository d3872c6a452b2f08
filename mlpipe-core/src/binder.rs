//! Schema binding between typed records and column stores
//!
//! A record type describes itself once through a [`RecordSchema`]: an
//! explicit list of fields, each with a column identity and a kind. Input
//! fields are bound by source position ([`ColumnId::Index`]), which is how
//! loaders lay out rows; output fields are bound by column name
//! ([`ColumnId::Name`]), which is how pipeline stages address the columns
//! they produce.
//!
//! [`SchemaBinder`] turns rows or records into a [`ColumnStore`] and
//! [`OutputBinder`] turns a store back into records. Both resolve the field
//! mapping when they are constructed and reuse it for every call.

use std::collections::HashSet;
use std::fmt;

use crate::column::{Column, Value};
use crate::error::{Error, Result};
use crate::schema::{DataType, Field, Schema};
use crate::store::{AppendMode, ColumnStore};

const BINDER: &str = "SchemaBinder";
const OUTPUT_BINDER: &str = "OutputBinder";

/// A positional row as produced by a loader: cell `i` is source column `i`
pub type Row = Vec<Value>;

/// Identity of the column a record field is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnId {
    /// Position in the source row
    Index(usize),

    /// Name of a column in the store
    Name(String),
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnId::Index(index) => write!(f, "#{index}"),
            ColumnId::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Semantic kind of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Floating point scalar
    Numeric,

    /// Text or categorical token
    Text,

    /// Float vector
    Vector,
}

impl FieldKind {
    /// Column data type this kind binds to
    pub fn data_type(self) -> DataType {
        match self {
            FieldKind::Numeric => DataType::Numeric,
            FieldKind::Text => DataType::Text,
            FieldKind::Vector => DataType::Vector(None),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Numeric => write!(f, "numeric"),
            FieldKind::Text => write!(f, "text"),
            FieldKind::Vector => write!(f, "vector"),
        }
    }
}

/// One field of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    name: String,
    column: Option<ColumnId>,
    kind: FieldKind,
}

impl FieldBinding {
    /// Field name; input fields produce a store column of the same name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared column identity, absent for unbound output-only fields
    pub fn column(&self) -> Option<&ColumnId> {
        self.column.as_ref()
    }

    /// Semantic kind
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Source position, for fields bound by index
    pub fn source_index(&self) -> Option<usize> {
        match self.column {
            Some(ColumnId::Index(index)) => Some(index),
            _ => None,
        }
    }

    /// Store column this field reads from when binding out
    pub fn output_column(&self) -> &str {
        match &self.column {
            Some(ColumnId::Name(name)) => name,
            _ => &self.name,
        }
    }
}

/// Declarative description of a record type's fields and their column
/// bindings, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    record: String,
    fields: Vec<FieldBinding>,
}

impl RecordSchema {
    /// Start describing the record type `record`
    pub fn builder(record: &str) -> RecordSchemaBuilder {
        RecordSchemaBuilder {
            schema: RecordSchema {
                record: record.to_string(),
                fields: Vec::new(),
            },
        }
    }

    /// Name of the record type
    pub fn record(&self) -> &str {
        &self.record
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[FieldBinding] {
        &self.fields
    }

    /// Fields bound to a source position, in declaration order
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields.iter().filter(|f| f.source_index().is_some())
    }

    /// Check that field names and column identities are unique
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut identities = HashSet::new();

        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(Error::schema(
                    BINDER,
                    field.name.as_str(),
                    format!("record type '{}' declares field '{}' twice", self.record, field.name),
                ));
            }

            if let Some(column) = &field.column {
                if !identities.insert(column) {
                    return Err(Error::schema(
                        BINDER,
                        field.name.as_str(),
                        format!(
                            "record type '{}' binds column {} to more than one field",
                            self.record, column
                        ),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Builder for [`RecordSchema`]
#[derive(Debug, Clone)]
pub struct RecordSchemaBuilder {
    schema: RecordSchema,
}

impl RecordSchemaBuilder {
    /// Add a field bound to a source position
    #[must_use]
    pub fn index(self, name: &str, index: usize, kind: FieldKind) -> Self {
        self.field(name, Some(ColumnId::Index(index)), kind)
    }

    /// Add a field bound to a store column by name
    #[must_use]
    pub fn named(self, name: &str, column: &str, kind: FieldKind) -> Self {
        self.field(name, Some(ColumnId::Name(column.to_string())), kind)
    }

    /// Add an output-only field reading the store column of the same name
    #[must_use]
    pub fn unbound(self, name: &str, kind: FieldKind) -> Self {
        self.field(name, None, kind)
    }

    /// Add a field with an explicit identity
    #[must_use]
    pub fn field(mut self, name: &str, column: Option<ColumnId>, kind: FieldKind) -> Self {
        self.schema.fields.push(FieldBinding {
            name: name.to_string(),
            column,
            kind,
        });
        self
    }

    /// Finish the description; uniqueness is checked by the binders
    pub fn build(self) -> RecordSchema {
        self.schema
    }
}

/// A record type that can be fed into a pipeline
pub trait InputRecord {
    /// Describe the record type; called once per binder
    fn record_schema() -> RecordSchema;

    /// Values of the index-bound fields, in declaration order
    fn values(&self) -> Vec<Value>;
}

/// A record type that can be read back out of a column store
pub trait OutputRecord: Sized {
    /// Describe the record type; called once per binder
    fn record_schema() -> RecordSchema;

    /// Build one record from the values of its fields, in declaration order
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// Helper for [`OutputRecord::from_values`] implementations that takes
/// field values in declaration order and checks their kinds
#[derive(Debug)]
pub struct ValueReader {
    record: &'static str,
    values: std::vec::IntoIter<Value>,
}

impl ValueReader {
    /// Wrap the values handed to `from_values`
    pub fn new(record: &'static str, values: Vec<Value>) -> Self {
        Self {
            record,
            values: values.into_iter(),
        }
    }

    fn next(&mut self, field: &str) -> Result<Value> {
        self.values.next().ok_or_else(|| {
            Error::schema(OUTPUT_BINDER, field, format!("no value left for field of '{}'", self.record))
        })
    }

    fn mismatch(&self, field: &str, expected: &str, value: &Value) -> Error {
        Error::schema(
            OUTPUT_BINDER,
            field,
            format!("'{}' expected a {} value, got '{}'", self.record, expected, value),
        )
    }

    /// Take the next value as a float
    pub fn numeric(&mut self, field: &str) -> Result<f32> {
        match self.next(field)? {
            Value::Numeric(value) => Ok(value),
            Value::Missing => Ok(f32::NAN),
            other => Err(self.mismatch(field, "numeric", &other)),
        }
    }

    /// Take the next value as text
    pub fn text(&mut self, field: &str) -> Result<String> {
        match self.next(field)? {
            Value::Text(value) => Ok(value),
            Value::Missing => Ok(String::new()),
            other => Err(self.mismatch(field, "text", &other)),
        }
    }

    /// Take the next value as a float vector
    pub fn vector(&mut self, field: &str) -> Result<Vec<f32>> {
        match self.next(field)? {
            Value::Vector(values) => Ok(values),
            Value::Missing => Ok(Vec::new()),
            other => Err(self.mismatch(field, "vector", &other)),
        }
    }
}

#[derive(Debug, Clone)]
struct InputSlot {
    field: String,
    source: usize,
    kind: FieldKind,
}

/// Binds positional rows or typed records into a [`ColumnStore`]
#[derive(Debug, Clone)]
pub struct SchemaBinder {
    record: String,
    slots: Vec<InputSlot>,
    row_width: usize,
}

impl SchemaBinder {
    /// Resolve the field mapping of a record type
    ///
    /// Fails with a schema error if two fields share a column identity, or
    /// if a field is not bound to a source position: rows carry no column
    /// names, so a name-bound or unbound input field could never be filled.
    pub fn new(schema: &RecordSchema) -> Result<Self> {
        schema.validate()?;

        let slots = schema
            .fields
            .iter()
            .map(|field| match &field.column {
                Some(ColumnId::Index(source)) => Ok(InputSlot {
                    field: field.name.clone(),
                    source: *source,
                    kind: field.kind,
                }),
                Some(ColumnId::Name(column)) => Err(Error::schema(
                    BINDER,
                    field.name.as_str(),
                    format!(
                        "input field of '{}' is bound to column '{}' by name; input fields need a source index",
                        schema.record, column
                    ),
                )),
                None => Err(Error::schema(
                    BINDER,
                    field.name.as_str(),
                    format!("input field of '{}' has no source index", schema.record),
                )),
            })
            .collect::<Result<Vec<InputSlot>>>()?;

        let row_width = slots.iter().map(|s| s.source + 1).max().unwrap_or(0);

        tracing::trace!(record = %schema.record, fields = slots.len(), row_width, "Resolved input binding");

        Ok(Self {
            record: schema.record.clone(),
            slots,
            row_width,
        })
    }

    /// Binder for an [`InputRecord`] type
    pub fn for_record<I: InputRecord>() -> Result<Self> {
        Self::new(&I::record_schema())
    }

    /// Name of the bound record type
    pub fn record(&self) -> &str {
        &self.record
    }

    /// Minimum number of cells a row must have
    pub fn row_width(&self) -> usize {
        self.row_width
    }

    /// Schema of the stores produced by [`SchemaBinder::bind_in`]
    pub fn store_schema(&self) -> Schema {
        Schema::new(
            self.slots
                .iter()
                .map(|slot| Field::new(&slot.field, slot.kind.data_type()))
                .collect(),
        )
    }

    /// Bind positional rows into a new store, one column per input field
    pub fn bind_in<R>(&self, rows: R) -> Result<ColumnStore>
    where
        R: IntoIterator<Item = Row>,
    {
        let rows = rows.into_iter();
        let capacity = rows.size_hint().0;
        let mut columns: Vec<Column> = self
            .slots
            .iter()
            .map(|slot| Column::with_capacity(&slot.field, slot.kind.data_type(), capacity))
            .collect();

        let mut row_count = 0;
        for (row_index, mut row) in rows.enumerate() {
            if row.len() < self.row_width {
                return Err(Error::schema_general(
                    BINDER,
                    format!(
                        "row {} of '{}' has {} values but the record type binds column #{}",
                        row_index,
                        self.record,
                        row.len(),
                        self.row_width - 1
                    ),
                ));
            }

            for (slot, column) in self.slots.iter().zip(columns.iter_mut()) {
                let value = std::mem::replace(&mut row[slot.source], Value::Missing);
                self.check_kind(slot, row_index, &value)?;
                column.push(value).map_err(|err| {
                    Error::schema(BINDER, slot.field.as_str(), format!("row {row_index}: {err}"))
                })?;
            }
            row_count += 1;
        }

        let mut store = ColumnStore::new(row_count);
        for column in columns {
            store.append(column, AppendMode::Fail)?;
        }
        Ok(store)
    }

    /// Lay out one record's field values positionally by their identities
    pub fn row_from_values(&self, values: Vec<Value>) -> Result<Row> {
        if values.len() != self.slots.len() {
            return Err(Error::schema_general(
                BINDER,
                format!(
                    "'{}' provided {} values for {} index-bound fields",
                    self.record,
                    values.len(),
                    self.slots.len()
                ),
            ));
        }

        let mut row = vec![Value::Missing; self.row_width];
        for (slot, value) in self.slots.iter().zip(values) {
            row[slot.source] = value;
        }
        Ok(row)
    }

    /// Bind typed records into a new store
    pub fn bind_records<I: InputRecord>(&self, records: &[I]) -> Result<ColumnStore> {
        let rows = records
            .iter()
            .map(|record| self.row_from_values(record.values()))
            .collect::<Result<Vec<_>>>()?;
        self.bind_in(rows)
    }

    fn check_kind(&self, slot: &InputSlot, row_index: usize, value: &Value) -> Result<()> {
        match value.data_type() {
            Some(data_type) if !data_type.compatible_with(&slot.kind.data_type()) => Err(Error::schema(
                BINDER,
                slot.field.as_str(),
                format!(
                    "row {} of '{}': column #{} holds '{}', expected a {} value",
                    row_index, self.record, slot.source, value, slot.kind
                ),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct OutputSlot {
    field: String,
    column: String,
    kind: FieldKind,
}

/// Reads records back out of a [`ColumnStore`] by column name
#[derive(Debug, Clone)]
pub struct OutputBinder {
    record: String,
    slots: Vec<OutputSlot>,
}

impl OutputBinder {
    /// Resolve the field mapping of an output record type
    ///
    /// Fails with a schema error if two fields read the same store column,
    /// whether the column is named explicitly or taken from the field name.
    pub fn new(schema: &RecordSchema) -> Result<Self> {
        schema.validate()?;

        let mut seen = HashSet::new();
        for field in &schema.fields {
            if !seen.insert(field.output_column()) {
                return Err(Error::schema(
                    OUTPUT_BINDER,
                    field.name.as_str(),
                    format!(
                        "record type '{}' reads column '{}' into more than one field",
                        schema.record,
                        field.output_column()
                    ),
                ));
            }
        }

        let slots = schema
            .fields
            .iter()
            .map(|field| OutputSlot {
                field: field.name.clone(),
                column: field.output_column().to_string(),
                kind: field.kind,
            })
            .collect();

        Ok(Self {
            record: schema.record.clone(),
            slots,
        })
    }

    /// Binder for an [`OutputRecord`] type
    pub fn for_record<O: OutputRecord>() -> Result<Self> {
        Self::new(&O::record_schema())
    }

    /// Store columns the output record reads, in field order
    pub fn required_columns(&self) -> Vec<&str> {
        self.slots.iter().map(|s| s.column.as_str()).collect()
    }

    /// Check that a schema provides every column the record reads
    pub fn check_schema(&self, schema: &Schema) -> Result<()> {
        for slot in &self.slots {
            let field = schema.require(OUTPUT_BINDER, &slot.column)?;
            if !field.data_type().compatible_with(&slot.kind.data_type()) {
                return Err(self.kind_error(slot, *field.data_type()));
            }
        }
        Ok(())
    }

    /// Build one record per row, reading every bound column at that row
    pub fn bind_out<O: OutputRecord>(&self, store: &ColumnStore) -> Result<Vec<O>> {
        let columns = self
            .slots
            .iter()
            .map(|slot| {
                let column = store.require(OUTPUT_BINDER, &slot.column)?;
                if !column.data_type().compatible_with(&slot.kind.data_type()) {
                    return Err(self.kind_error(slot, column.data_type()));
                }
                Ok(column)
            })
            .collect::<Result<Vec<_>>>()?;

        (0..store.row_count())
            .map(|row| {
                let values = columns
                    .iter()
                    .map(|column| column.value(row).unwrap_or(Value::Missing))
                    .collect();
                O::from_values(values)
            })
            .collect()
    }

    fn kind_error(&self, slot: &OutputSlot, found: DataType) -> Error {
        Error::schema(
            OUTPUT_BINDER,
            slot.column.as_str(),
            format!(
                "field '{}' of '{}' is {} but the column holds {}",
                slot.field, self.record, slot.kind, found
            ),
        )
    }
}
