//! Column concatenation into a single feature vector

use std::sync::Arc;

use mlpipe_core::{
    AppendMode, Column, ColumnStore, DataType, Error, Field, FittedTransform, Result, Schema, Transform,
};

const NAME: &str = "ColumnConcatenator";

/// Joins numeric and vector columns, in declared order, into one `Vector`
/// column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConcatenator {
    output: String,
    sources: Vec<String>,
}

impl ColumnConcatenator {
    /// Concatenate `sources` into `output`
    pub fn new<'a>(output: &str, sources: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            output: output.to_string(),
            sources: sources.into_iter().map(str::to_string).collect(),
        }
    }

    /// Name of the produced column
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Transform for ColumnConcatenator {
    fn name(&self) -> &str {
        NAME
    }

    fn inputs(&self) -> Vec<&str> {
        self.sources.iter().map(String::as_str).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        vec![&self.output]
    }

    fn validate(&self, input_schema: &Schema) -> Result<Schema> {
        if self.sources.is_empty() {
            return Err(Error::schema(NAME, self.output.as_str(), "no source columns to concatenate"));
        }

        let mut width = Some(0);
        for source in &self.sources {
            let data_type = *input_schema.require(NAME, source)?.data_type();
            if !data_type.is_numeric() {
                return Err(Error::schema(
                    NAME,
                    source.as_str(),
                    format!("cannot concatenate a {data_type} column"),
                ));
            }
            width = width.zip(data_type.width()).map(|(total, w)| total + w);
        }

        let mut schema = input_schema.clone();
        schema.upsert(Field::new(&self.output, DataType::Vector(width)));
        Ok(schema)
    }

    fn fit(&self, store: &ColumnStore) -> Result<Arc<dyn FittedTransform>> {
        let mut widths = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            widths.push((source.clone(), numeric_width(store.require(NAME, source)?)?));
        }
        tracing::debug!(
            output = %self.output,
            width = widths.iter().map(|(_, w)| w).sum::<usize>(),
            "Fitted concatenation"
        );

        Ok(Arc::new(FittedConcatenator {
            output: self.output.clone(),
            sources: widths,
        }))
    }
}

/// Source widths recorded when a [`ColumnConcatenator`] was fitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedConcatenator {
    output: String,
    sources: Vec<(String, usize)>,
}

impl FittedConcatenator {
    /// Total width of the produced vector
    pub fn width(&self) -> usize {
        self.sources.iter().map(|(_, width)| width).sum()
    }
}

impl FittedTransform for FittedConcatenator {
    fn name(&self) -> &str {
        NAME
    }

    fn apply(&self, store: &mut ColumnStore) -> Result<()> {
        let mut columns = Vec::with_capacity(self.sources.len());
        for (source, fitted_width) in &self.sources {
            let column = store.require(NAME, source)?;
            let width = numeric_width(column)?;
            if width != *fitted_width {
                return Err(Error::schema(
                    NAME,
                    source.as_str(),
                    format!("column has width {width} but was fitted with width {fitted_width}"),
                ));
            }
            columns.push(column);
        }

        let rows = store.row_count();
        let width = self.width();
        let output = if width == 0 {
            Column::empty_vector(&self.output, rows)
        } else {
            let mut values = Vec::with_capacity(rows * width);
            for row in 0..rows {
                for column in &columns {
                    values.extend_from_slice(column.row_slice(row).unwrap_or_default());
                }
            }
            Column::vector(&self.output, width, values)?
        };

        store.append(output, AppendMode::Replace)
    }
}

fn numeric_width(column: &Column) -> Result<usize> {
    column.width().ok_or_else(|| {
        Error::schema(
            NAME,
            column.name(),
            format!("cannot concatenate a {} column", column.data_type()),
        )
    })
}
