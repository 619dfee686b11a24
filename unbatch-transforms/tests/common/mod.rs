//! Helpers shared by the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use unbatch_core::schema::{Dim, ElementSpec};
use unbatch_core::{DenseTensor, InMemorySource, Record, SparseTensor, Tensor, TensorData};

/// Install a fmt subscriber writing to the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Stack equally shaped elements along a new leading dimension
pub fn stack(elements: &[Record]) -> Record {
    let first = &elements[0];
    (0..first.len())
        .map(|c| {
            let parts = elements
                .iter()
                .map(|e| e.component(c).unwrap())
                .collect::<Vec<_>>();
            match parts[0] {
                Tensor::Dense(_) => stack_dense(&parts),
                Tensor::Sparse(_) => stack_sparse(&parts),
            }
        })
        .collect()
}

fn stack_dense(parts: &[&Tensor]) -> Tensor {
    let parts = parts.iter().map(|p| p.as_dense().unwrap()).collect::<Vec<_>>();
    let mut data = TensorData::empty(parts[0].dtype());
    for part in &parts {
        data.extend_from(part.data()).unwrap();
    }
    let mut shape = vec![parts.len()];
    shape.extend_from_slice(parts[0].shape());
    DenseTensor::new(data, shape).unwrap().into()
}

fn stack_sparse(parts: &[&Tensor]) -> Tensor {
    let parts = parts.iter().map(|p| p.as_sparse().unwrap()).collect::<Vec<_>>();
    let mut indices = Vec::new();
    let mut values = TensorData::empty(parts[0].dtype());
    for (i, part) in parts.iter().enumerate() {
        for coordinate in part.coordinates() {
            indices.push(i);
            indices.extend_from_slice(coordinate);
        }
        values.extend_from(part.values()).unwrap();
    }
    let mut dense_shape = vec![parts.len()];
    dense_shape.extend_from_slice(parts[0].dense_shape());
    SparseTensor::new(indices, values, dense_shape).unwrap().into()
}

/// Group elements into batches of `size`; the last batch may be shorter
pub fn batch(elements: &[Record], size: usize) -> Vec<Record> {
    elements.chunks(size).map(stack).collect()
}

/// Spec of `record` with every leading dimension left unknown
pub fn batch_spec(record: &Record) -> Arc<ElementSpec> {
    let spec = record.spec();
    let components = spec
        .components()
        .iter()
        .map(|c| c.with_shape(c.shape.without_leading().unwrap().with_leading(Dim::Unknown)))
        .collect();
    Arc::new(ElementSpec::new(components))
}

/// In-memory source over `batches`, allowing batches of any size
pub fn source(batches: Vec<Record>) -> InMemorySource {
    let spec = batch_spec(&batches[0]);
    InMemorySource::new(spec, batches)
}

/// A dense vector of `i64`
pub fn int_vector(values: Vec<i64>) -> Tensor {
    let len = values.len();
    DenseTensor::from_vec(values, vec![len]).unwrap().into()
}

/// An `n x n` sparse matrix with `i` stored at `(i, i)`
pub fn diagonal(n: usize) -> SparseTensor {
    let rows = (0..n).map(|i| vec![i, i]).collect::<Vec<_>>();
    SparseTensor::from_coo(&rows, (0..n as i64).collect(), vec![n, n]).unwrap()
}
