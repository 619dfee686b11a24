//! Upstream producers of batched records

use std::sync::Arc;

use crate::error::Result;
use crate::record::Record;
use crate::schema::ElementSpec;

/// A producer of batches for the pipeline
pub trait BatchSource: Send {
    /// Static description of the batches this source produces
    fn element_spec(&self) -> Arc<ElementSpec>;

    /// Retrieve the next batch from this source
    /// Returns None when exhausted
    fn next_batch(&mut self) -> Result<Option<Record>>;

    /// Provides a hint about the number of remaining batches (if known)
    fn batch_count_hint(&self) -> Option<usize> {
        None
    }

    /// Reset the source to start producing from the beginning
    fn reset(&mut self) -> Result<()>;
}

impl<S: BatchSource + ?Sized> BatchSource for Box<S> {
    fn element_spec(&self) -> Arc<ElementSpec> {
        (**self).element_spec()
    }

    fn next_batch(&mut self) -> Result<Option<Record>> {
        (**self).next_batch()
    }

    fn batch_count_hint(&self) -> Option<usize> {
        (**self).batch_count_hint()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }
}

/// A source backed by a vector of batches held in memory
#[derive(Debug, Clone)]
pub struct InMemorySource {
    /// Declared spec of every batch
    spec: Arc<ElementSpec>,

    /// The batches to produce
    batches: Vec<Record>,

    /// The current batch index
    current_index: usize,
}

impl InMemorySource {
    /// Create a source with an explicit spec
    ///
    /// The spec may leave dimensions or ranks unknown; batches are not checked
    /// against it here.
    pub fn new(spec: Arc<ElementSpec>, batches: Vec<Record>) -> Self {
        Self {
            spec,
            batches,
            current_index: 0,
        }
    }

    /// Create a source whose spec is inferred from the first batch
    pub fn from_batches(batches: Vec<Record>) -> Self {
        let spec = batches
            .first()
            .map(Record::spec)
            .unwrap_or_else(|| ElementSpec::new(Vec::new()));
        Self::new(Arc::new(spec), batches)
    }

    /// Create a source producing a single batch
    pub fn from_record(record: Record) -> Self {
        Self::from_batches(vec![record])
    }

    /// Get the batches of this source
    pub fn batches(&self) -> &[Record] {
        &self.batches
    }
}

impl BatchSource for InMemorySource {
    fn element_spec(&self) -> Arc<ElementSpec> {
        self.spec.clone()
    }

    fn next_batch(&mut self) -> Result<Option<Record>> {
        let Some(batch) = self.batches.get(self.current_index) else {
            return Ok(None);
        };

        self.current_index += 1;
        Ok(Some(batch.clone()))
    }

    fn batch_count_hint(&self) -> Option<usize> {
        Some(self.batches.len() - self.current_index)
    }

    fn reset(&mut self) -> Result<()> {
        tracing::trace!(batches = self.batches.len(), "resetting in-memory source");
        self.current_index = 0;
        Ok(())
    }
}

/// A source that draws batches from an iterator
///
/// Useful for generated or unbounded inputs. It cannot be reset.
pub struct IterSource<I> {
    spec: Arc<ElementSpec>,
    batches: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Result<Record>> + Send,
{
    /// Create a source over `batches` declared with `spec`
    pub fn new(spec: Arc<ElementSpec>, batches: I) -> Self {
        Self { spec, batches }
    }
}

impl<I> BatchSource for IterSource<I>
where
    I: Iterator<Item = Result<Record>> + Send,
{
    fn element_spec(&self) -> Arc<ElementSpec> {
        self.spec.clone()
    }

    fn next_batch(&mut self) -> Result<Option<Record>> {
        self.batches.next().transpose()
    }

    fn reset(&mut self) -> Result<()> {
        Err(crate::error::Error::Source(
            "Iterator-backed sources cannot be reset".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::DenseTensor;

    fn batch(values: Vec<i32>) -> Record {
        let len = values.len();
        Record::new(vec![DenseTensor::from_vec(values, vec![len]).unwrap().into()])
    }

    #[test]
    fn test_in_memory_source_drains_and_resets() {
        let mut source = InMemorySource::from_batches(vec![batch(vec![1, 2]), batch(vec![3])]);
        assert_eq!(source.batch_count_hint(), Some(2));
        assert_eq!(source.next_batch().unwrap(), Some(batch(vec![1, 2])));
        assert_eq!(source.next_batch().unwrap(), Some(batch(vec![3])));
        assert_eq!(source.next_batch().unwrap(), None);
        assert_eq!(source.next_batch().unwrap(), None);

        source.reset().unwrap();
        assert_eq!(source.batch_count_hint(), Some(2));
    }

    #[test]
    fn test_empty_source_has_empty_spec() {
        let mut source = InMemorySource::from_batches(Vec::new());
        assert!(source.element_spec().is_empty());
        assert!(source.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_iter_source_propagates_errors() {
        let spec = Arc::new(batch(vec![0]).spec());
        let items = vec![
            Ok(batch(vec![1])),
            Err(crate::error::Error::Source("disk gone".into())),
        ];
        let mut source = IterSource::new(spec, items.into_iter());
        assert!(source.next_batch().unwrap().is_some());
        assert!(matches!(source.next_batch(), Err(crate::error::Error::Source(_))));
        assert!(source.next_batch().unwrap().is_none());
        assert!(source.reset().is_err());
    }
}
