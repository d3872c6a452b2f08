//! One-hot encoding of categorical text columns
//!
//! Fitting learns one [`Vocabulary`] per source column, in first-occurrence
//! order. Applying replaces each source column with a `Vector` column that
//! has one slot per vocabulary entry, plus a trailing slot for unseen values
//! when the policy is [`UnknownPolicy::Bucket`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mlpipe_core::{
    AppendMode, Column, ColumnStore, DataType, Error, Field, FittedTransform, Result, Schema, Transform,
};

const NAME: &str = "OneHotVectorizer";

/// Rows per shard when the vocabulary scan runs in parallel
#[cfg(feature = "parallel")]
const SHARD_ROWS: usize = 16 * 1024;

/// What to do with a category the vocabulary has never seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// Encode as an all-zero vector
    #[default]
    ZeroFill,

    /// Reserve one extra trailing slot for every unseen value
    Bucket,

    /// Fail the apply with a schema error
    Error,
}

impl UnknownPolicy {
    fn extra_slots(self) -> usize {
        match self {
            UnknownPolicy::Bucket => 1,
            UnknownPolicy::ZeroFill | UnknownPolicy::Error => 0,
        }
    }
}

/// Distinct tokens of one column in first-occurrence order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Scan values in order, keeping the first occurrence of each token
    pub fn scan<S: AsRef<str>>(values: &[S]) -> Self {
        let mut vocabulary = Self::default();
        for value in values {
            vocabulary.insert(value.as_ref());
        }
        vocabulary
    }

    #[cfg(feature = "parallel")]
    fn scan_sharded(values: &[String]) -> Self {
        use rayon::prelude::*;

        if values.len() <= SHARD_ROWS {
            return Self::scan(values);
        }

        // Shards come back in order, and merging in order keeps each token at
        // the position of its first occurrence in the whole column.
        let shards: Vec<Vocabulary> = values.par_chunks(SHARD_ROWS).map(Self::scan).collect();
        let mut vocabulary = Self::default();
        for shard in shards {
            vocabulary.merge(shard);
        }
        vocabulary
    }

    fn insert(&mut self, token: &str) {
        if !self.index.contains_key(token) {
            self.index.insert(token.to_string(), self.tokens.len());
            self.tokens.push(token.to_string());
        }
    }

    /// Append the tokens of `other` that this vocabulary does not hold yet
    pub fn merge(&mut self, other: Vocabulary) {
        for token in other.tokens {
            if !self.index.contains_key(&token) {
                self.index.insert(token.clone(), self.tokens.len());
                self.tokens.push(token);
            }
        }
    }

    /// Slot of a token, if it was seen during fitting
    pub fn slot(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Tokens in slot order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of distinct tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Check if no token was seen
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// One-hot encodes text columns in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotVectorizer {
    columns: Vec<String>,
    policy: UnknownPolicy,
}

impl OneHotVectorizer {
    /// Encode the given columns with the default [`UnknownPolicy::ZeroFill`]
    pub fn new<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            columns: columns.into_iter().map(str::to_string).collect(),
            policy: UnknownPolicy::default(),
        }
    }

    /// Set the unknown-category policy
    #[must_use]
    pub fn with_policy(mut self, policy: UnknownPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl Transform for OneHotVectorizer {
    fn name(&self) -> &str {
        NAME
    }

    fn inputs(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    fn outputs(&self) -> Vec<&str> {
        self.inputs()
    }

    fn validate(&self, input_schema: &Schema) -> Result<Schema> {
        let mut schema = input_schema.clone();
        for column in &self.columns {
            let field = schema.require(NAME, column)?;
            if *field.data_type() != DataType::Text {
                return Err(Error::schema(
                    NAME,
                    column.as_str(),
                    format!("expected a Text column, found {}", field.data_type()),
                ));
            }
            schema.upsert(Field::new(column, DataType::Vector(None)));
        }
        Ok(schema)
    }

    fn fit(&self, store: &ColumnStore) -> Result<Arc<dyn FittedTransform>> {
        let mut encodings = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let values = text_values(store, column)?;

            #[cfg(feature = "parallel")]
            let vocabulary = Vocabulary::scan_sharded(values);
            #[cfg(not(feature = "parallel"))]
            let vocabulary = Vocabulary::scan(values);

            tracing::debug!(column = %column, categories = vocabulary.len(), "Fitted vocabulary");
            encodings.push((column.clone(), vocabulary));
        }

        Ok(Arc::new(FittedVectorizer {
            encodings,
            policy: self.policy,
        }))
    }
}

/// Learned vocabularies of a [`OneHotVectorizer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedVectorizer {
    encodings: Vec<(String, Vocabulary)>,
    policy: UnknownPolicy,
}

impl FittedVectorizer {
    fn encode(&self, column: &str, vocabulary: &Vocabulary, values: &[String]) -> Result<Column> {
        let width = vocabulary.len() + self.policy.extra_slots();
        if width == 0 {
            return Ok(Column::empty_vector(column, values.len()));
        }

        let mut encoded = vec![0.0_f32; values.len() * width];
        for (row, value) in values.iter().enumerate() {
            let slot = match (vocabulary.slot(value), self.policy) {
                (Some(slot), _) => slot,
                (None, UnknownPolicy::ZeroFill) => continue,
                (None, UnknownPolicy::Bucket) => vocabulary.len(),
                (None, UnknownPolicy::Error) => {
                    return Err(Error::schema(
                        NAME,
                        column,
                        format!("category '{value}' at row {row} was not seen during fitting"),
                    ));
                }
            };
            encoded[row * width + slot] = 1.0;
        }

        Column::vector(column, width, encoded)
    }
}

impl FittedTransform for FittedVectorizer {
    fn name(&self) -> &str {
        NAME
    }

    fn apply(&self, store: &mut ColumnStore) -> Result<()> {
        for (column, vocabulary) in &self.encodings {
            let encoded = self.encode(column, vocabulary, text_values(store, column)?)?;
            store.append(encoded, AppendMode::Replace)?;
        }
        Ok(())
    }
}

fn text_values<'a>(store: &'a ColumnStore, column: &str) -> Result<&'a [String]> {
    let source = store.require(NAME, column)?;
    source.as_text().ok_or_else(|| {
        Error::schema(
            NAME,
            column,
            format!("expected a Text column, found {}", source.data_type()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn store(vendors: &[&str]) -> ColumnStore {
        ColumnStore::from_columns(vec![Column::text("VendorId", vendors.iter().copied())]).unwrap()
    }

    fn fitted(policy: UnknownPolicy) -> Arc<dyn FittedTransform> {
        OneHotVectorizer::new(["VendorId"])
            .with_policy(policy)
            .fit(&store(&["VTS", "CMT", "VTS"]))
            .unwrap()
    }

    #[test]
    fn test_vocabulary_first_occurrence_order() {
        let vocabulary = Vocabulary::scan(&["CMT", "VTS", "CMT", "DDS"]);
        assert_eq!(vocabulary.tokens(), &["CMT", "VTS", "DDS"]);
        assert_eq!(vocabulary.slot("DDS"), Some(2));
        assert_eq!(vocabulary.slot("XYZ"), None);
    }

    #[test]
    fn test_vocabulary_merge_keeps_order() {
        let mut left = Vocabulary::scan(&["a", "b"]);
        left.merge(Vocabulary::scan(&["c", "a", "d"]));
        assert_eq!(left.tokens(), &["a", "b", "c", "d"]);
    }

    #[test]
    fn test_apply_replaces_column_with_one_hot_vectors() {
        let mut store = store(&["VTS", "CMT", "VTS"]);
        let state = fitted(UnknownPolicy::ZeroFill);
        state.apply(&mut store).unwrap();

        let column = store.get("VendorId").unwrap();
        assert_eq!(column.data_type(), DataType::Vector(Some(2)));
        assert_eq!(column.row_slice(0), Some(&[1.0, 0.0][..]));
        assert_eq!(column.row_slice(1), Some(&[0.0, 1.0][..]));
        assert_eq!(column.row_slice(2), Some(&[1.0, 0.0][..]));
    }

    #[test_case(UnknownPolicy::ZeroFill, &[0.0, 0.0] ; "zero fill")]
    #[test_case(UnknownPolicy::Bucket, &[0.0, 0.0, 1.0] ; "bucket")]
    fn test_unseen_category(policy: UnknownPolicy, expected: &[f32]) {
        let mut store = store(&["XYZ"]);
        fitted(policy).apply(&mut store).unwrap();
        assert_eq!(store.get("VendorId").unwrap().row_slice(0), Some(expected));
    }

    #[test]
    fn test_unseen_category_error_policy() {
        let mut store = store(&["CMT", "XYZ"]);
        let err = fitted(UnknownPolicy::Error).apply(&mut store).unwrap_err();
        assert_eq!(err.column(), Some("VendorId"));
        assert!(err.to_string().contains("XYZ"));
        // Failed apply leaves the text column in place
        assert_eq!(store.get("VendorId").unwrap().data_type(), DataType::Text);
    }

    #[test]
    fn test_validate_rejects_numeric_source() {
        let schema = Schema::new(vec![Field::new("VendorId", DataType::Numeric)]);
        let err = OneHotVectorizer::new(["VendorId"]).validate(&schema).unwrap_err();
        assert_eq!(err.column(), Some("VendorId"));
    }

    #[test]
    fn test_validate_marks_width_unknown() {
        let schema = Schema::new(vec![Field::new("VendorId", DataType::Text)]);
        let schema = OneHotVectorizer::new(["VendorId"]).validate(&schema).unwrap();
        assert_eq!(schema.field_by_name("VendorId").unwrap().data_type(), &DataType::Vector(None));
    }

    #[test]
    fn test_empty_training_store_gives_zero_width() {
        let empty = store(&[]);
        let state = OneHotVectorizer::new(["VendorId"]).fit(&empty).unwrap();
        let mut store = store(&["VTS", "CMT"]);
        state.apply(&mut store).unwrap();
        let column = store.get("VendorId").unwrap();
        assert_eq!(column.width(), Some(0));
        assert_eq!(column.len(), 2);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_sharded_scan_matches_sequential() {
        let values: Vec<String> = (0..SHARD_ROWS * 3 + 17).map(|i| format!("v{}", (i * 7919) % 501)).collect();
        assert_eq!(Vocabulary::scan_sharded(&values), Vocabulary::scan(&values));
    }

    proptest! {
        #[test]
        fn prop_training_rows_are_one_hot(vendors in prop::collection::vec("[A-D]{1,2}", 1..40)) {
            let mut store = ColumnStore::from_columns(vec![Column::text("VendorId", vendors.clone())]).unwrap();
            let state = OneHotVectorizer::new(["VendorId"]).fit(&store).unwrap();
            state.apply(&mut store).unwrap();

            let vocabulary = Vocabulary::scan(&vendors);
            let column = store.get("VendorId").unwrap();
            prop_assert_eq!(column.width(), Some(vocabulary.len()));
            for (row, vendor) in vendors.iter().enumerate() {
                let slots = column.row_slice(row).unwrap();
                prop_assert_eq!(slots.iter().sum::<f32>(), 1.0);
                prop_assert_eq!(slots[vocabulary.slot(vendor).unwrap()], 1.0);
            }
        }
    }
}
