//! Transform traits for column stores

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::schema::Schema;
use crate::store::ColumnStore;

/// A pipeline step that derives new columns from existing ones
///
/// A transform is a descriptor: it knows which columns it reads and writes
/// and how to learn whatever state it needs from training data. Fitting
/// returns an immutable [`FittedTransform`] that does the actual work and is
/// replayed unchanged at prediction time.
pub trait Transform: Debug + Send + Sync {
    /// Stage name used in errors and logs
    fn name(&self) -> &str;

    /// Columns this transform reads
    fn inputs(&self) -> Vec<&str>;

    /// Columns this transform writes
    fn outputs(&self) -> Vec<&str>;

    /// Get the output schema for this transform when applied to the given
    /// input schema, failing if a required input is not available
    fn validate(&self, input_schema: &Schema) -> Result<Schema>;

    /// Learn the transform state from a training store
    fn fit(&self, store: &ColumnStore) -> Result<Arc<dyn FittedTransform>>;
}

/// A transform with all of its state fixed
///
/// `apply` must be deterministic: the same input store always produces the
/// same output columns, whatever the number of rows.
pub trait FittedTransform: Debug + Send + Sync {
    /// Stage name used in errors and logs
    fn name(&self) -> &str;

    /// Write this transform's output columns into the store
    fn apply(&self, store: &mut ColumnStore) -> Result<()>;
}

/// A chain of fitted transforms that can be executed as a single transform
#[derive(Debug, Clone, Default)]
pub struct FittedChain {
    /// The transforms in this chain
    transforms: Vec<Arc<dyn FittedTransform>>,
}

impl FittedChain {
    /// Create a new transform chain
    pub fn new(transforms: Vec<Arc<dyn FittedTransform>>) -> Self {
        Self { transforms }
    }

    /// Get a reference to the transforms in this chain
    pub fn transforms(&self) -> &[Arc<dyn FittedTransform>] {
        &self.transforms
    }

    /// Number of transforms in this chain
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if this chain has no transforms
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl FittedTransform for FittedChain {
    fn name(&self) -> &str {
        "FittedChain"
    }

    fn apply(&self, store: &mut ColumnStore) -> Result<()> {
        for transform in &self.transforms {
            tracing::trace!(stage = transform.name(), rows = store.row_count(), "Applying transform");
            transform.apply(store)?;
        }
        Ok(())
    }
}

/// Thread a schema through a sequence of transforms
pub fn validate_chain<'a, I>(transforms: I, input_schema: &Schema) -> Result<Schema>
where
    I: IntoIterator<Item = &'a dyn Transform>,
{
    let mut current = input_schema.clone();
    for transform in transforms {
        current = transform.validate(&current)?;
        tracing::debug!(stage = transform.name(), columns = current.len(), "Validated stage");
    }
    Ok(current)
}
