//! Slicing single elements out of a validated batch

use unbatch_core::error::{Error, Result};
use unbatch_core::{DenseTensor, Record, SparseTensor, Tensor};

use crate::config::SparseSelection;

/// Sub-array at `index` along the leading dimension
pub fn slice_dense(tensor: &DenseTensor, index: usize) -> Result<DenseTensor> {
    let Some((&len, rest)) = tensor.shape().split_first() else {
        return Err(Error::InvalidArgument(
            "Cannot slice a scalar tensor along its leading dimension".into(),
        ));
    };
    if index >= len {
        return Err(Error::IndexOutOfBounds { index, len });
    }

    let row_len: usize = rest.iter().product();
    let start = index * row_len;
    let data = tensor.data().slice(start..start + row_len)?;
    DenseTensor::new(data, rest.to_vec())
}

/// Positions of the coordinate rows whose leading coordinate equals `index`,
/// in storage order
pub fn matching_rows(tensor: &SparseTensor, index: usize) -> Vec<usize> {
    tensor
        .coordinates()
        .enumerate()
        .filter(|(_, coordinate)| coordinate.first() == Some(&index))
        .map(|(position, _)| position)
        .collect()
}

/// Build the element made of the given coordinate rows, leading column removed
pub fn sparse_from_rows(tensor: &SparseTensor, positions: &[usize]) -> Result<SparseTensor> {
    if tensor.rank() == 0 {
        return Err(Error::InvalidArgument(
            "Cannot slice a rank-0 sparse tensor along its leading dimension".into(),
        ));
    }

    let indices = positions
        .iter()
        .flat_map(|&position| tensor.coordinate(position)[1..].iter().copied())
        .collect();
    let values = tensor.values().gather(positions)?;
    SparseTensor::new(indices, values, tensor.dense_shape()[1..].to_vec())
}

/// Element `index` of a sparse batch, found by scanning every coordinate row
pub fn slice_sparse(tensor: &SparseTensor, index: usize) -> Result<SparseTensor> {
    match tensor.leading_dim() {
        Some(len) if index >= len => Err(Error::IndexOutOfBounds { index, len }),
        _ => sparse_from_rows(tensor, &matching_rows(tensor, index)),
    }
}

/// Slice element `index` out of every component of `batch`
pub fn slice_record(batch: &Record, index: usize) -> Result<Record> {
    batch
        .components()
        .iter()
        .map(|tensor| match tensor {
            Tensor::Dense(t) => slice_dense(t, index).map(Tensor::Dense),
            Tensor::Sparse(t) => slice_sparse(t, index).map(Tensor::Sparse),
        })
        .collect::<Result<Vec<_>>>()
        .map(Record::new)
}

/// Coordinate row positions of a sparse batch grouped by leading coordinate
///
/// Holds one entry per stored value, independent of the leading dimension's size.
#[derive(Debug, Clone)]
pub struct SparseRowIndex {
    /// Row positions, stably sorted by leading coordinate
    positions: Vec<usize>,

    /// Leading coordinate of each entry in `positions`
    keys: Vec<usize>,
}

impl SparseRowIndex {
    /// Group every coordinate row of `tensor`
    pub fn build(tensor: &SparseTensor) -> Result<Self> {
        if tensor.rank() == 0 {
            return Err(Error::InvalidArgument(
                "Cannot index a rank-0 sparse tensor by leading coordinate".into(),
            ));
        }

        let mut positions = (0..tensor.nnz()).collect::<Vec<_>>();
        positions.sort_by_key(|&position| tensor.coordinate(position)[0]);
        let keys = positions
            .iter()
            .map(|&position| tensor.coordinate(position)[0])
            .collect();
        Ok(Self { positions, keys })
    }

    /// Row positions belonging to element `index`, in storage order
    pub fn rows(&self, index: usize) -> &[usize] {
        let start = self.keys.partition_point(|&key| key < index);
        let end = start + self.keys[start..].partition_point(|&key| key == index);
        &self.positions[start..end]
    }
}

/// A validated batch ready to be split, with per-component lookup state
#[derive(Debug)]
pub struct PreparedBatch {
    batch: Record,
    size: usize,
    /// One entry per component; `Some` for sparse components when indexed
    row_indices: Vec<Option<SparseRowIndex>>,
}

impl PreparedBatch {
    /// Prepare `batch`, whose components all have leading dimension `size`
    pub fn new(batch: Record, size: usize, selection: SparseSelection) -> Result<Self> {
        let row_indices = batch
            .components()
            .iter()
            .map(|tensor| match (tensor, selection) {
                (Tensor::Sparse(t), SparseSelection::Indexed) => SparseRowIndex::build(t).map(Some),
                _ => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            batch,
            size,
            row_indices,
        })
    }

    /// Number of elements in the batch
    pub fn size(&self) -> usize {
        self.size
    }

    /// The underlying batch
    pub fn batch(&self) -> &Record {
        &self.batch
    }

    /// Slice out element `index`
    pub fn slice(&self, index: usize) -> Result<Record> {
        if index >= self.size {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.size,
            });
        }

        self.batch
            .components()
            .iter()
            .zip(&self.row_indices)
            .map(|(tensor, row_index)| match (tensor, row_index) {
                (Tensor::Dense(t), _) => slice_dense(t, index).map(Tensor::Dense),
                (Tensor::Sparse(t), Some(rows)) => {
                    sparse_from_rows(t, rows.rows(index)).map(Tensor::Sparse)
                }
                (Tensor::Sparse(t), None) => slice_sparse(t, index).map(Tensor::Sparse),
            })
            .collect::<Result<Vec<_>>>()
            .map(Record::new)
    }
}
