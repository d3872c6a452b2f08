//! Trained models produced by fitting a pipeline

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::binder::{InputRecord, OutputBinder, OutputRecord, Row, SchemaBinder};
use crate::error::{Error, Result};
use crate::evaluate::Scorer;
use crate::source::Loader;
use crate::store::ColumnStore;
use crate::trainer::Predictor;
use crate::transform::{FittedChain, FittedTransform};

const STAGE: &str = "TrainedModel";

/// The immutable result of a successful pipeline fit
///
/// Owns the fitted state of every transform and the fitted predictor.
/// Prediction never mutates the model, so one model can serve concurrent
/// callers from several threads.
pub struct TrainedModel<I, O> {
    id: Uuid,
    binder: SchemaBinder,
    output: OutputBinder,
    transforms: FittedChain,
    predictor: Arc<dyn Predictor>,
    feature_column: String,
    label_column: String,
    _records: PhantomData<fn(&I) -> O>,
}

impl<I, O> TrainedModel<I, O>
where
    I: InputRecord,
    O: OutputRecord,
{
    pub(crate) fn new(
        binder: SchemaBinder,
        output: OutputBinder,
        transforms: FittedChain,
        predictor: Arc<dyn Predictor>,
        feature_column: String,
        label_column: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            binder,
            output,
            transforms,
            predictor,
            feature_column,
            label_column,
            _records: PhantomData,
        }
    }

    /// Unique id of this model, used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fitted transforms, in pipeline order
    pub fn transforms(&self) -> &[Arc<dyn FittedTransform>] {
        self.transforms.transforms()
    }

    /// The fitted predictor
    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Bind records into a store for [`Scorer::score`] or an evaluator
    pub fn bind_records(&self, records: &[I]) -> Result<ColumnStore> {
        self.binder.bind_records(records)
    }

    /// Load rows of the input record type and bind them, typically held-out
    /// data for evaluation
    pub fn load(&self, loader: &dyn Loader) -> Result<ColumnStore> {
        let rows = loader.load(&I::record_schema())?;
        tracing::debug!(model = %self.id, source = %loader.describe(), rows = rows.len(), "Loaded rows");
        self.binder.bind_in(rows)
    }

    /// Predict one record
    pub fn predict(&self, record: &I) -> Result<O> {
        self.predict_batch(std::slice::from_ref(record))?
            .pop()
            .ok_or_else(|| Error::schema_general(STAGE, "prediction produced no rows"))
    }

    /// Predict a batch of records; result `i` belongs to record `i`
    ///
    /// Every row goes through exactly the same steps as in
    /// [`TrainedModel::predict`], so a batch gives the same numbers as
    /// predicting its records one at a time.
    pub fn predict_batch(&self, records: &[I]) -> Result<Vec<O>> {
        let _span = tracing::debug_span!("predict", model = %self.id, rows = records.len()).entered();
        let store = self.binder.bind_records(records)?;
        self.predict_store(store)
    }

    /// Predict positional rows as produced by a loader
    pub fn predict_rows(&self, rows: Vec<Row>) -> Result<Vec<O>> {
        let _span = tracing::debug_span!("predict_rows", model = %self.id, rows = rows.len()).entered();
        let store = self.binder.bind_in(rows)?;
        self.predict_store(store)
    }

    fn predict_store(&self, store: ColumnStore) -> Result<Vec<O>> {
        let scored = self.score(store)?;
        self.output.bind_out(&scored)
    }
}

impl<I, O> Scorer for TrainedModel<I, O>
where
    I: InputRecord,
    O: OutputRecord,
{
    fn score(&self, mut store: ColumnStore) -> Result<ColumnStore> {
        let required = self.binder.store_schema();
        for field in required.fields() {
            let column = store.get(field.name()).ok_or_else(|| {
                Error::schema(
                    STAGE,
                    field.name(),
                    format!("input does not provide a column required by '{}'", self.binder.record()),
                )
            })?;
            if !column.data_type().compatible_with(field.data_type()) {
                return Err(Error::schema(
                    STAGE,
                    field.name(),
                    format!("expected {} column, got {}", field.data_type(), column.data_type()),
                ));
            }
        }

        self.transforms.apply(&mut store)?;
        self.predictor.apply(&self.feature_column, &mut store)?;
        tracing::trace!(model = %self.id, rows = store.row_count(), "Scored store");
        Ok(store)
    }

    fn score_column(&self) -> &str {
        self.predictor.score_column()
    }

    fn label_column(&self) -> &str {
        &self.label_column
    }
}

impl<I, O> fmt::Debug for TrainedModel<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("id", &self.id)
            .field("record", &self.binder.record())
            .field("transforms", &self.transforms.len())
            .field("predictor", &self.predictor)
            .field("feature_column", &self.feature_column)
            .finish()
    }
}
