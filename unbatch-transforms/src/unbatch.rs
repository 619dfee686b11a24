//! The unbatch iterator: splits each upstream batch into its elements
//!
//! The iterator is pull-based. It asks its [`BatchSource`] for a batch only
//! when the previous one has been fully emitted, validates the batch once, and
//! then yields one [`Record`] per index along the shared leading dimension.

use std::sync::Arc;

use tracing::{debug, trace, warn};
use uuid::Uuid;

use unbatch_core::error::{Error, Result};
use unbatch_core::schema::ElementSpec;
use unbatch_core::transform::RecordTransform;
use unbatch_core::{BatchSource, Record};

use crate::config::{ErrorPolicy, UnbatchConfig};
use crate::slice::PreparedBatch;
use crate::validate::UnbatchPlan;

/// Where the iterator stands between pulls
#[derive(Debug)]
pub(crate) enum State {
    /// No batch held; the next pull asks upstream
    NeedBatch,

    /// A validated batch with elements still to emit
    HasBatch {
        /// The batch being split
        batch: PreparedBatch,
        /// Index of the next element to emit
        next_index: usize,
    },

    /// Upstream ended or a terminating error occurred
    Exhausted,
}

/// Outcome of advancing the state machine by one step
pub(crate) enum Step {
    /// An element (or the error slicing it)
    Element(Result<Record>),

    /// A batch must be pulled and handed to [`Cursor::accept`]
    NeedBatch,

    /// Nothing more will be produced
    Exhausted,
}

/// Source-independent unbatch state shared by the blocking and async adapters
#[derive(Debug)]
pub(crate) struct Cursor {
    id: Uuid,
    plan: UnbatchPlan,
    config: UnbatchConfig,
    state: State,
    batches_consumed: u64,
    elements_produced: u64,
}

impl Cursor {
    pub(crate) fn new(input_spec: Arc<ElementSpec>, config: UnbatchConfig) -> Result<Self> {
        let plan = UnbatchPlan::new(input_spec)?.with_element_spec_check(config.check_element_spec);
        let id = Uuid::new_v4();
        debug!(
            iterator = %id,
            element_spec = %plan.element_spec(),
            batch_dim = %plan.batch_dim(),
            "created unbatch iterator"
        );

        Ok(Self {
            id,
            plan,
            config,
            state: State::NeedBatch,
            batches_consumed: 0,
            elements_produced: 0,
        })
    }

    /// Emit the next element of the held batch, if any
    pub(crate) fn step(&mut self) -> Step {
        let (batch, next_index) = match &mut self.state {
            State::Exhausted => return Step::Exhausted,
            State::NeedBatch => return Step::NeedBatch,
            State::HasBatch { batch, next_index } => (batch, next_index),
        };

        if *next_index >= batch.size() {
            trace!(iterator = %self.id, size = batch.size(), "batch fully emitted");
            self.state = State::NeedBatch;
            return Step::NeedBatch;
        }

        let index = *next_index;
        *next_index += 1;
        match batch.slice(index) {
            Ok(element) => {
                self.elements_produced += 1;
                trace!(iterator = %self.id, index, "emitting element");
                Step::Element(Ok(element))
            }
            Err(e) => Step::Element(Err(self.fail(e))),
        }
    }

    /// Take the result of an upstream pull
    pub(crate) fn accept(&mut self, batch: Option<Record>) -> Result<()> {
        let Some(batch) = batch else {
            debug!(
                iterator = %self.id,
                batches = self.batches_consumed,
                elements = self.elements_produced,
                "upstream exhausted"
            );
            self.state = State::Exhausted;
            return Ok(());
        };

        self.batches_consumed += 1;
        match self.prepare(batch) {
            Ok(batch) => {
                debug!(iterator = %self.id, size = batch.size(), "pulled batch");
                self.state = State::HasBatch {
                    batch,
                    next_index: 0,
                };
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn prepare(&self, batch: Record) -> Result<PreparedBatch> {
        let size = self.plan.validate(&batch)?;
        PreparedBatch::new(batch, size, self.config.sparse_selection)
    }

    /// Apply the error policy and hand the error back
    fn fail(&mut self, error: Error) -> Error {
        warn!(
            iterator = %self.id,
            policy = ?self.config.error_policy,
            error = %error,
            "dropping invalid batch"
        );
        self.state = match self.config.error_policy {
            ErrorPolicy::Terminate => State::Exhausted,
            ErrorPolicy::SkipBatch => State::NeedBatch,
        };
        error
    }

    pub(crate) fn reset(&mut self) {
        self.state = State::NeedBatch;
        self.batches_consumed = 0;
        self.elements_produced = 0;
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn plan(&self) -> &UnbatchPlan {
        &self.plan
    }

    pub(crate) fn config(&self) -> &UnbatchConfig {
        &self.config
    }

    pub(crate) fn batches_consumed(&self) -> u64 {
        self.batches_consumed
    }

    pub(crate) fn elements_produced(&self) -> u64 {
        self.elements_produced
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        matches!(self.state, State::Exhausted)
    }
}

/// Iterator over the elements of every batch produced by a source
#[derive(Debug)]
pub struct Unbatch<S> {
    source: S,
    cursor: Cursor,
}

impl<S: BatchSource> Unbatch<S> {
    /// Create an iterator with the default configuration
    ///
    /// Fails with [`Error::SchemaMismatch`] if the source's spec proves the
    /// batches cannot be split.
    pub fn new(source: S) -> Result<Self> {
        Self::with_config(source, UnbatchConfig::default())
    }

    /// Create an iterator with an explicit configuration
    pub fn with_config(source: S, config: UnbatchConfig) -> Result<Self> {
        let cursor = Cursor::new(source.element_spec(), config)?;
        Ok(Self { source, cursor })
    }

    /// Produce the next element, or `Ok(None)` once every batch is consumed
    ///
    /// Upstream errors are returned unchanged and leave the iterator ready to
    /// pull again. Validation errors are handled according to the configured
    /// [`ErrorPolicy`].
    pub fn next_element(&mut self) -> Result<Option<Record>> {
        loop {
            match self.cursor.step() {
                Step::Element(element) => return element.map(Some),
                Step::Exhausted => return Ok(None),
                Step::NeedBatch => {
                    let batch = self.source.next_batch()?;
                    self.cursor.accept(batch)?;
                }
            }
        }
    }

    /// Restart from the first batch of the source
    pub fn reset(&mut self) -> Result<()> {
        self.source.reset()?;
        self.cursor.reset();
        debug!(iterator = %self.cursor.id(), "reset unbatch iterator");
        Ok(())
    }

    /// Spec of the produced elements
    pub fn element_spec(&self) -> Arc<ElementSpec> {
        self.cursor.plan().element_spec().clone()
    }

    /// The validated plan this iterator runs
    pub fn plan(&self) -> &UnbatchPlan {
        self.cursor.plan()
    }

    /// Configuration of this iterator
    pub fn config(&self) -> &UnbatchConfig {
        self.cursor.config()
    }

    /// Identifier recorded in this iterator's log events
    pub fn id(&self) -> Uuid {
        self.cursor.id()
    }

    /// Number of batches pulled from upstream, valid or not
    pub fn batches_consumed(&self) -> u64 {
        self.cursor.batches_consumed()
    }

    /// Number of elements emitted
    pub fn elements_produced(&self) -> u64 {
        self.cursor.elements_produced()
    }

    /// Whether every later pull will return `Ok(None)`
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    /// Give back the source, dropping any partially consumed batch
    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: BatchSource> Iterator for Unbatch<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_element().transpose()
    }
}

/// Builds unbatch iterators and describes their output spec
#[derive(Debug, Clone, Default)]
pub struct UnbatchOp {
    config: UnbatchConfig,
}

impl UnbatchOp {
    /// Create an operation with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an operation with an explicit configuration
    pub fn with_config(config: UnbatchConfig) -> Self {
        Self { config }
    }

    /// Configuration handed to every iterator this operation builds
    pub fn config(&self) -> &UnbatchConfig {
        &self.config
    }

    /// Wrap `source` in an unbatch iterator
    pub fn apply<S: BatchSource>(&self, source: S) -> Result<Unbatch<S>> {
        Unbatch::with_config(source, self.config.clone())
    }
}

impl RecordTransform for UnbatchOp {
    fn output_spec(&self, input: &ElementSpec) -> Result<Arc<ElementSpec>> {
        let plan = UnbatchPlan::new(Arc::new(input.clone()))?;
        Ok(plan.element_spec().clone())
    }
}

/// Unbatch `source` with the default configuration
pub fn unbatch<S: BatchSource>(source: S) -> Result<Unbatch<S>> {
    Unbatch::new(source)
}
