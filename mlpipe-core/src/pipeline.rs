//! Pipeline definition, validation and fitting
//!
//! A pipeline moves through `Unvalidated → Validated → Fitting → Fitted`.
//! The states are types: only a [`Pipeline<I, O, Validated>`] can be fitted,
//! and fitting consumes it, so fitting twice or fitting an unvalidated
//! definition does not compile. The `Fitting` state only exists inside
//! [`Pipeline::fit`]; its result is a [`TrainedModel`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::binder::{InputRecord, OutputBinder, OutputRecord, RecordSchema, SchemaBinder};
use crate::error::{Error, Result};
use crate::model::TrainedModel;
use crate::schema::{DataType, Field, Schema};
use crate::source::Loader;
use crate::store::ColumnStore;
use crate::trainer::Trainer;
use crate::transform::{validate_chain, FittedChain, FittedTransform, Transform};

const STAGE: &str = "Pipeline";

/// State of a pipeline that has not been checked yet
#[derive(Debug, Clone, Copy, Default)]
pub struct Unvalidated;

/// State of a pipeline whose stages are known to fit together
#[derive(Debug, Clone)]
pub struct Validated {
    record_schema: RecordSchema,
    binder: SchemaBinder,
    output: OutputBinder,
    output_schema: Schema,
}

impl Validated {
    /// Schema of the store after every stage, including the score column
    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}

/// Collects the stages of a pipeline
pub struct PipelineBuilder<I, O> {
    loader: Option<Box<dyn Loader>>,
    transforms: Vec<Box<dyn Transform>>,
    _records: PhantomData<fn(&I) -> O>,
}

impl<I, O> Default for PipelineBuilder<I, O> {
    fn default() -> Self {
        Self {
            loader: None,
            transforms: Vec::new(),
            _records: PhantomData,
        }
    }
}

impl<I, O> PipelineBuilder<I, O>
where
    I: InputRecord,
    O: OutputRecord,
{
    /// Start an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loader used by [`Pipeline::train`]
    #[must_use]
    pub fn loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Append a transform stage
    #[must_use]
    pub fn add(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Append a boxed transform stage
    #[must_use]
    pub fn add_boxed(mut self, transform: Box<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// Close the pipeline with its terminal trainer
    pub fn trainer(self, trainer: impl Trainer + 'static) -> Pipeline<I, O, Unvalidated> {
        Pipeline {
            loader: self.loader,
            transforms: self.transforms,
            trainer: Box::new(trainer),
            state: Unvalidated,
            _records: PhantomData,
        }
    }
}

/// An ordered list of stages: optional loader, transforms, one trainer
pub struct Pipeline<I, O, S = Unvalidated> {
    loader: Option<Box<dyn Loader>>,
    transforms: Vec<Box<dyn Transform>>,
    trainer: Box<dyn Trainer>,
    state: S,
    _records: PhantomData<fn(&I) -> O>,
}

impl<I, O> Pipeline<I, O, Unvalidated>
where
    I: InputRecord,
    O: OutputRecord,
{
    /// Start building a pipeline
    pub fn builder() -> PipelineBuilder<I, O> {
        PipelineBuilder::new()
    }

    /// Walk the stages once, threading the available columns through each
    ///
    /// Fails at the first stage whose inputs are not available, naming the
    /// stage and the missing column, before any data is touched.
    pub fn validate(self) -> Result<Pipeline<I, O, Validated>> {
        let record_schema = I::record_schema();
        let binder = SchemaBinder::new(&record_schema)?;
        let output = OutputBinder::for_record::<O>()?;

        let mut schema = validate_chain(self.transforms.iter().map(|transform| &**transform), &binder.store_schema())?;

        self.trainer.validate(&schema)?;
        schema.upsert(Field::new(self.trainer.score_column(), DataType::Numeric));
        output.check_schema(&schema)?;

        tracing::debug!(
            record = record_schema.record(),
            stages = self.transforms.len() + 1,
            "Pipeline validated"
        );

        Ok(Pipeline {
            loader: self.loader,
            transforms: self.transforms,
            trainer: self.trainer,
            state: Validated {
                record_schema,
                binder,
                output,
                output_schema: schema,
            },
            _records: PhantomData,
        })
    }
}

impl<I, O> Pipeline<I, O, Validated>
where
    I: InputRecord,
    O: OutputRecord,
{
    /// Schema of the store after every stage, including the score column
    pub fn output_schema(&self) -> &Schema {
        self.state.output_schema()
    }

    /// Bind records with this pipeline's input binding
    pub fn bind_records(&self, records: &[I]) -> Result<ColumnStore> {
        self.state.binder.bind_records(records)
    }

    /// Load rows through the pipeline's loader and fit
    pub fn train(self) -> Result<TrainedModel<I, O>> {
        let loader = self.loader.as_ref().ok_or_else(|| {
            Error::schema_general(STAGE, "pipeline has no loader; use fit with a bound store instead")
        })?;

        let rows = loader.load(&self.state.record_schema)?;
        tracing::info!(source = %loader.describe(), rows = rows.len(), "Loaded training data");
        let store = self.state.binder.bind_in(rows)?;
        self.fit(store)
    }

    /// Fit every transform in order, then the trainer, and freeze the result
    ///
    /// Each transform is fitted on the store as left by the preceding
    /// stages and immediately applied to it. The store is consumed; a
    /// failure leaves nothing behind.
    pub fn fit(self, mut store: ColumnStore) -> Result<TrainedModel<I, O>> {
        let _span = tracing::info_span!("fit", record = self.state.binder.record(), rows = store.row_count()).entered();

        for field in self.state.binder.store_schema().fields() {
            store.require(STAGE, field.name())?;
        }

        let mut fitted: Vec<Arc<dyn FittedTransform>> = Vec::with_capacity(self.transforms.len());
        for transform in &self.transforms {
            for input in transform.inputs() {
                store.require(transform.name(), input)?;
            }
            let state = transform.fit(&store)?;
            state.apply(&mut store)?;
            for output in transform.outputs() {
                store.require(transform.name(), output)?;
            }
            tracing::debug!(stage = transform.name(), columns = store.column_count(), "Fitted stage");
            fitted.push(state);
        }

        let features = store.require(self.trainer.name(), self.trainer.feature_column())?;
        let label = store.require(self.trainer.name(), self.trainer.label_column())?;
        let predictor = self.trainer.train(features, label)?;
        if predictor.score_column() != self.trainer.score_column() {
            return Err(Error::training(
                self.trainer.name(),
                format!(
                    "predictor writes '{}' but the trainer declared '{}'",
                    predictor.score_column(),
                    self.trainer.score_column()
                ),
            ));
        }
        tracing::info!(trainer = self.trainer.name(), rows = store.row_count(), "Trained predictor");

        Ok(TrainedModel::new(
            self.state.binder,
            self.state.output,
            FittedChain::new(fitted),
            predictor,
            self.trainer.feature_column().to_string(),
            self.trainer.label_column().to_string(),
        ))
    }
}

impl<I, O, S: fmt::Debug> fmt::Debug for Pipeline<I, O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("loader", &self.loader)
            .field("transforms", &self.transforms)
            .field("trainer", &self.trainer)
            .field("state", &self.state)
            .finish()
    }
}
