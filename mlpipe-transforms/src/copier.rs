//! Column copying

use std::sync::Arc;

use mlpipe_core::{AppendMode, ColumnStore, Field, FittedTransform, Result, Schema, Transform};

const NAME: &str = "ColumnCopier";

/// Copies columns under new names, replacing any existing column with the
/// destination name
///
/// Pairs are applied in order, so a later pair may read a column written
/// by an earlier one. Stateless: fitting returns the copier itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCopier {
    pairs: Vec<(String, String)>,
}

impl ColumnCopier {
    /// Copy each `(source, destination)` pair
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(source, destination)| (source.to_string(), destination.to_string()))
                .collect(),
        }
    }

    /// Copy a single column
    pub fn single(source: &str, destination: &str) -> Self {
        Self::new([(source, destination)])
    }
}

impl Transform for ColumnCopier {
    fn name(&self) -> &str {
        NAME
    }

    fn inputs(&self) -> Vec<&str> {
        self.pairs.iter().map(|(source, _)| source.as_str()).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        self.pairs.iter().map(|(_, destination)| destination.as_str()).collect()
    }

    fn validate(&self, input_schema: &Schema) -> Result<Schema> {
        let mut schema = input_schema.clone();
        for (source, destination) in &self.pairs {
            let data_type = *schema.require(NAME, source)?.data_type();
            schema.upsert(Field::new(destination, data_type));
        }
        Ok(schema)
    }

    fn fit(&self, _store: &ColumnStore) -> Result<Arc<dyn FittedTransform>> {
        Ok(Arc::new(self.clone()))
    }
}

impl FittedTransform for ColumnCopier {
    fn name(&self) -> &str {
        NAME
    }

    fn apply(&self, store: &mut ColumnStore) -> Result<()> {
        for (source, destination) in &self.pairs {
            let copy = store.require(NAME, source)?.clone().renamed(destination);
            store.append(copy, AppendMode::Replace)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlpipe_core::{Column, DataType};

    fn store() -> ColumnStore {
        ColumnStore::from_columns(vec![
            Column::text("VendorId", ["VTS", "CMT"]),
            Column::numeric("FareAmount", vec![5.5, 12.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_copy_adds_destination() {
        let copier = ColumnCopier::single("FareAmount", "Label");
        let mut store = store();
        copier.fit(&store).unwrap().apply(&mut store).unwrap();

        assert_eq!(store.names(), vec!["VendorId", "FareAmount", "Label"]);
        assert_eq!(store.get("Label").unwrap().as_numeric().unwrap(), &[5.5, 12.0]);
        assert_eq!(store.get("Label").unwrap().name(), "Label");
    }

    #[test]
    fn test_copy_over_existing_column_replaces_it() {
        let copier = ColumnCopier::single("FareAmount", "VendorId");
        let mut store = store();
        FittedTransform::apply(&copier, &mut store).unwrap();

        assert_eq!(store.column_count(), 2);
        assert_eq!(store.get("VendorId").unwrap().data_type(), DataType::Numeric);
    }

    #[test]
    fn test_validate_threads_pairs() {
        let copier = ColumnCopier::new([("FareAmount", "Label"), ("Label", "Target")]);
        let schema = copier.validate(&store().schema()).unwrap();
        assert_eq!(schema.field_by_name("Target").unwrap().data_type(), &DataType::Numeric);
    }

    #[test]
    fn test_validate_missing_source() {
        let copier = ColumnCopier::single("Fare", "Label");
        let err = copier.validate(&store().schema()).unwrap_err();
        assert_eq!(err.column(), Some("Fare"));
        assert_eq!(err.stage(), Some(NAME));
    }
}
