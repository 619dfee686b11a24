//! An unbatch iterator that several consumers can pull from

use std::sync::{Arc, Mutex};

use unbatch_core::error::{Error, Result};
use unbatch_core::schema::ElementSpec;
use unbatch_core::{BatchSource, Record};

use crate::unbatch::Unbatch;

/// Thread-safe handle to an [`Unbatch`] iterator
///
/// Every pull runs under one lock, so each element is handed to exactly one
/// consumer and elements of a batch are never interleaved with a half-validated
/// one.
pub struct SharedUnbatch<S> {
    inner: Arc<Mutex<Unbatch<S>>>,
    element_spec: Arc<ElementSpec>,
}

impl<S: BatchSource> SharedUnbatch<S> {
    /// Share an existing iterator
    pub fn new(iter: Unbatch<S>) -> Self {
        let element_spec = iter.element_spec();
        Self {
            inner: Arc::new(Mutex::new(iter)),
            element_spec,
        }
    }

    /// Produce the next element, see [`Unbatch::next_element`]
    pub fn next_element(&self) -> Result<Option<Record>> {
        self.inner.lock().map_err(|_| Error::Poisoned)?.next_element()
    }

    /// Spec of the produced elements
    pub fn element_spec(&self) -> Arc<ElementSpec> {
        self.element_spec.clone()
    }

    /// Number of elements emitted across all handles
    pub fn elements_produced(&self) -> Result<u64> {
        Ok(self.inner.lock().map_err(|_| Error::Poisoned)?.elements_produced())
    }
}

impl<S> Clone for SharedUnbatch<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            element_spec: Arc::clone(&self.element_spec),
        }
    }
}

impl<S: BatchSource> Iterator for SharedUnbatch<S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_element().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use unbatch_core::{DenseTensor, InMemorySource};

    #[test]
    fn test_consumers_split_elements() {
        let batches = (0..8)
            .map(|b| {
                let values = (b * 4..b * 4 + 4).collect::<Vec<i32>>();
                Record::new(vec![DenseTensor::from_vec(values, vec![4]).unwrap().into()])
            })
            .collect();
        let shared = SharedUnbatch::new(Unbatch::new(InMemorySource::from_batches(batches)).unwrap());

        let handles = (0..4)
            .map(|_| {
                let consumer = shared.clone();
                thread::spawn(move || {
                    consumer
                        .map(|element| {
                            let element = element.unwrap();
                            element.component(0).unwrap().as_dense().unwrap().values::<i32>().unwrap()[0]
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect::<Vec<_>>();

        let mut seen = handles.into_iter().flat_map(|h| h.join().unwrap()).collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, (0..32).collect::<Vec<_>>());
        assert_eq!(shared.elements_produced().unwrap(), 32);
    }
}
