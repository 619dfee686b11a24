//! Dense and sparse tensor values

use std::ops::Range;

use static_assertions::assert_impl_all;

use crate::error::{Error, Result};
use crate::schema::{ComponentKind, DataType};

/// Typed, contiguous, row-major storage for tensor values
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    /// Boolean values
    Boolean(Vec<bool>),
    /// 8-bit signed integers
    Int8(Vec<i8>),
    /// 16-bit signed integers
    Int16(Vec<i16>),
    /// 32-bit signed integers
    Int32(Vec<i32>),
    /// 64-bit signed integers
    Int64(Vec<i64>),
    /// 8-bit unsigned integers
    UInt8(Vec<u8>),
    /// 16-bit unsigned integers
    UInt16(Vec<u16>),
    /// 32-bit unsigned integers
    UInt32(Vec<u32>),
    /// 64-bit unsigned integers
    UInt64(Vec<u64>),
    /// 32-bit floats
    Float32(Vec<f32>),
    /// 64-bit floats
    Float64(Vec<f64>),
    /// Byte strings
    String(Vec<Vec<u8>>),
}

/// Run `$body` with `$v` bound to the inner vector, whatever its type
macro_rules! dispatch {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::Boolean($v) => $body,
            TensorData::Int8($v) => $body,
            TensorData::Int16($v) => $body,
            TensorData::Int32($v) => $body,
            TensorData::Int64($v) => $body,
            TensorData::UInt8($v) => $body,
            TensorData::UInt16($v) => $body,
            TensorData::UInt32($v) => $body,
            TensorData::UInt64($v) => $body,
            TensorData::Float32($v) => $body,
            TensorData::Float64($v) => $body,
            TensorData::String($v) => $body,
        }
    };
}

/// Like `dispatch!`, rewrapping the resulting vector in the same variant
macro_rules! map_data {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            TensorData::Boolean($v) => TensorData::Boolean($body),
            TensorData::Int8($v) => TensorData::Int8($body),
            TensorData::Int16($v) => TensorData::Int16($body),
            TensorData::Int32($v) => TensorData::Int32($body),
            TensorData::Int64($v) => TensorData::Int64($body),
            TensorData::UInt8($v) => TensorData::UInt8($body),
            TensorData::UInt16($v) => TensorData::UInt16($body),
            TensorData::UInt32($v) => TensorData::UInt32($body),
            TensorData::UInt64($v) => TensorData::UInt64($body),
            TensorData::Float32($v) => TensorData::Float32($body),
            TensorData::Float64($v) => TensorData::Float64($body),
            TensorData::String($v) => TensorData::String($body),
        }
    };
}

/// Run `$body` on two vectors of the same variant, or evaluate `$mismatch`
macro_rules! zip_data {
    ($a:expr, $b:expr, $x:ident, $y:ident => $body:expr, $mismatch:expr) => {
        match ($a, $b) {
            (TensorData::Boolean($x), TensorData::Boolean($y)) => $body,
            (TensorData::Int8($x), TensorData::Int8($y)) => $body,
            (TensorData::Int16($x), TensorData::Int16($y)) => $body,
            (TensorData::Int32($x), TensorData::Int32($y)) => $body,
            (TensorData::Int64($x), TensorData::Int64($y)) => $body,
            (TensorData::UInt8($x), TensorData::UInt8($y)) => $body,
            (TensorData::UInt16($x), TensorData::UInt16($y)) => $body,
            (TensorData::UInt32($x), TensorData::UInt32($y)) => $body,
            (TensorData::UInt64($x), TensorData::UInt64($y)) => $body,
            (TensorData::Float32($x), TensorData::Float32($y)) => $body,
            (TensorData::Float64($x), TensorData::Float64($y)) => $body,
            (TensorData::String($x), TensorData::String($y)) => $body,
            _ => $mismatch,
        }
    };
}

impl TensorData {
    /// Empty storage for the given element type
    pub fn empty(dtype: DataType) -> Self {
        Self::zeros(dtype, 0)
    }

    /// Zero-initialized storage of `len` values
    pub fn zeros(dtype: DataType, len: usize) -> Self {
        match dtype {
            DataType::Boolean => TensorData::Boolean(vec![false; len]),
            DataType::Int8 => TensorData::Int8(vec![0; len]),
            DataType::Int16 => TensorData::Int16(vec![0; len]),
            DataType::Int32 => TensorData::Int32(vec![0; len]),
            DataType::Int64 => TensorData::Int64(vec![0; len]),
            DataType::UInt8 => TensorData::UInt8(vec![0; len]),
            DataType::UInt16 => TensorData::UInt16(vec![0; len]),
            DataType::UInt32 => TensorData::UInt32(vec![0; len]),
            DataType::UInt64 => TensorData::UInt64(vec![0; len]),
            DataType::Float32 => TensorData::Float32(vec![0.0; len]),
            DataType::Float64 => TensorData::Float64(vec![0.0; len]),
            DataType::String => TensorData::String(vec![Vec::new(); len]),
        }
    }

    /// Element type of the stored values
    pub fn dtype(&self) -> DataType {
        match self {
            TensorData::Boolean(_) => DataType::Boolean,
            TensorData::Int8(_) => DataType::Int8,
            TensorData::Int16(_) => DataType::Int16,
            TensorData::Int32(_) => DataType::Int32,
            TensorData::Int64(_) => DataType::Int64,
            TensorData::UInt8(_) => DataType::UInt8,
            TensorData::UInt16(_) => DataType::UInt16,
            TensorData::UInt32(_) => DataType::UInt32,
            TensorData::UInt64(_) => DataType::UInt64,
            TensorData::Float32(_) => DataType::Float32,
            TensorData::Float64(_) => DataType::Float64,
            TensorData::String(_) => DataType::String,
        }
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    /// Check if no values are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy a contiguous range of values
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::IndexOutOfBounds {
                index: range.end,
                len: self.len(),
            });
        }
        Ok(map_data!(self, v => v[range].to_vec()))
    }

    /// Copy the values at the given positions, in the given order
    pub fn gather(&self, positions: &[usize]) -> Result<Self> {
        let len = self.len();
        if let Some(&index) = positions.iter().find(|&&p| p >= len) {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        Ok(map_data!(self, v => positions.iter().map(|&p| v[p].clone()).collect()))
    }

    /// Append every value of `other`, which must have the same element type
    pub fn extend_from(&mut self, other: &TensorData) -> Result<()> {
        let (expected, found) = (self.dtype(), other.dtype());
        zip_data!(self, other, dst, src => {
            dst.extend_from_slice(src);
            Ok(())
        }, Err(Error::TypeMismatch(format!(
            "Cannot append {} values to {} storage",
            found, expected
        ))))
    }

    /// Overwrite the value at `dst_pos` with `other[src_pos]`
    pub fn assign(&mut self, dst_pos: usize, other: &TensorData, src_pos: usize) -> Result<()> {
        let (dst_len, src_len) = (self.len(), other.len());
        if dst_pos >= dst_len {
            return Err(Error::IndexOutOfBounds { index: dst_pos, len: dst_len });
        }
        if src_pos >= src_len {
            return Err(Error::IndexOutOfBounds { index: src_pos, len: src_len });
        }
        let (expected, found) = (self.dtype(), other.dtype());
        zip_data!(self, other, dst, src => {
            dst[dst_pos] = src[src_pos].clone();
            Ok(())
        }, Err(Error::TypeMismatch(format!(
            "Cannot assign {} value into {} storage",
            found, expected
        ))))
    }

    /// Raw byte view of fixed-width numeric storage
    ///
    /// Booleans and strings have no plain byte representation and return `None`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TensorData::Int8(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Int16(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Int32(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Int64(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::UInt8(v) => Some(v.as_slice()),
            TensorData::UInt16(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::UInt32(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::UInt64(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Float32(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Float64(v) => Some(bytemuck::cast_slice(v.as_slice())),
            TensorData::Boolean(_) | TensorData::String(_) => None,
        }
    }

    /// Approximate memory held by the values in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            TensorData::Boolean(v) => v.len(),
            TensorData::String(v) => v.iter().map(Vec::len).sum(),
            other => other.as_bytes().map_or(0, <[u8]>::len),
        }
    }
}

/// Rust types that can be stored in a tensor
pub trait TensorType: Clone + Send + Sync + 'static {
    /// Element type tag for this Rust type
    const DTYPE: DataType;

    /// Wrap a vector of values as tensor storage
    fn into_data(values: Vec<Self>) -> TensorData;

    /// Borrow storage as a typed slice if the element type matches
    fn view(data: &TensorData) -> Option<&[Self]>;
}

macro_rules! impl_tensor_type {
    ($t:ty, $variant:ident) => {
        impl TensorType for $t {
            const DTYPE: DataType = DataType::$variant;

            fn into_data(values: Vec<Self>) -> TensorData {
                TensorData::$variant(values)
            }

            fn view(data: &TensorData) -> Option<&[Self]> {
                match data {
                    TensorData::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_tensor_type!(bool, Boolean);
impl_tensor_type!(i8, Int8);
impl_tensor_type!(i16, Int16);
impl_tensor_type!(i32, Int32);
impl_tensor_type!(i64, Int64);
impl_tensor_type!(u8, UInt8);
impl_tensor_type!(u16, UInt16);
impl_tensor_type!(u32, UInt32);
impl_tensor_type!(u64, UInt64);
impl_tensor_type!(f32, Float32);
impl_tensor_type!(f64, Float64);
impl_tensor_type!(Vec<u8>, String);

/// Number of elements of a dense tensor with `shape`
fn element_count(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| {
            Error::InvalidArgument(format!("Shape {:?} has too many elements", shape))
        })
}

/// A dense multidimensional tensor
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    /// Shape of the tensor; empty for scalars
    shape: Vec<usize>,

    /// Row-major values
    data: TensorData,
}

impl DenseTensor {
    /// Create a tensor from storage and a shape
    pub fn new(data: TensorData, shape: Vec<usize>) -> Result<Self> {
        let expected_size = element_count(&shape)?;
        if data.len() != expected_size {
            return Err(Error::InvalidArgument(format!(
                "Data length {} does not match shape {:?} (product {})",
                data.len(),
                shape,
                expected_size
            )));
        }

        Ok(Self { shape, data })
    }

    /// Create a tensor from a vector of values
    pub fn from_vec<T: TensorType>(values: Vec<T>, shape: Vec<usize>) -> Result<Self> {
        Self::new(T::into_data(values), shape)
    }

    /// Create a rank-0 tensor holding one value
    pub fn scalar<T: TensorType>(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: T::into_data(vec![value]),
        }
    }

    /// Create a string tensor
    pub fn from_strings<S: AsRef<[u8]>>(values: &[S], shape: Vec<usize>) -> Result<Self> {
        let values = values.iter().map(|s| s.as_ref().to_vec()).collect::<Vec<_>>();
        Self::from_vec(values, shape)
    }

    /// Get the shape of this tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this tensor holds no values
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element type
    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    /// Size of the leading dimension, `None` for scalars
    pub fn leading_dim(&self) -> Option<usize> {
        self.shape.first().copied()
    }

    /// Underlying storage
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Consume the tensor, returning its storage and shape
    pub fn into_parts(self) -> (TensorData, Vec<usize>) {
        (self.data, self.shape)
    }

    /// Typed view of the values if `T` matches the element type
    pub fn values<T: TensorType>(&self) -> Option<&[T]> {
        T::view(&self.data)
    }

    /// Approximate memory held by this tensor in bytes
    pub fn memory_usage(&self) -> usize {
        self.data.memory_usage() + self.shape.len() * std::mem::size_of::<usize>()
    }
}

/// A sparse tensor in coordinate (COO) format
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    /// Coordinates, `nnz` rows of `rank` entries, row-major
    indices: Vec<usize>,

    /// One value per coordinate row
    values: TensorData,

    /// Size of each dimension of the equivalent dense tensor
    dense_shape: Vec<usize>,
}

impl SparseTensor {
    /// Create a sparse tensor from flattened coordinates
    ///
    /// `indices` holds `values.len()` rows of `dense_shape.len()` coordinates.
    /// Every coordinate must lie inside `dense_shape`.
    pub fn new(indices: Vec<usize>, values: TensorData, dense_shape: Vec<usize>) -> Result<Self> {
        let rank = dense_shape.len();
        let nnz = values.len();
        if indices.len() != nnz * rank {
            return Err(Error::InvalidArgument(format!(
                "Sparse indices length {} must be values length {} times rank {}",
                indices.len(),
                nnz,
                rank
            )));
        }

        // Check indices are within bounds
        for row in 0..nnz {
            for (dim, &size) in dense_shape.iter().enumerate() {
                let index = indices[row * rank + dim];
                if index >= size {
                    return Err(Error::InvalidArgument(format!(
                        "Sparse coordinate {} in dimension {} is out of bounds for dense shape {:?}",
                        index, dim, dense_shape
                    )));
                }
            }
        }

        Ok(Self {
            indices,
            values,
            dense_shape,
        })
    }

    /// Create a sparse tensor from coordinate rows and typed values
    pub fn from_coo<T: TensorType>(
        rows: &[Vec<usize>],
        values: Vec<T>,
        dense_shape: Vec<usize>,
    ) -> Result<Self> {
        let rank = dense_shape.len();
        if let Some(row) = rows.iter().find(|r| r.len() != rank) {
            return Err(Error::InvalidArgument(format!(
                "Sparse coordinate {:?} does not have rank {}",
                row, rank
            )));
        }
        let indices = rows.iter().flatten().copied().collect();
        Self::new(indices, T::into_data(values), dense_shape)
    }

    /// A sparse tensor with no stored values
    pub fn empty(dtype: DataType, dense_shape: Vec<usize>) -> Self {
        Self {
            indices: Vec::new(),
            values: TensorData::empty(dtype),
            dense_shape,
        }
    }

    /// Get the number of stored values
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Get the rank of the equivalent dense tensor
    pub fn rank(&self) -> usize {
        self.dense_shape.len()
    }

    /// Get the dense shape
    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    /// Flattened coordinates
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Coordinate row `i`
    pub fn coordinate(&self, i: usize) -> &[usize] {
        let rank = self.rank();
        &self.indices[i * rank..(i + 1) * rank]
    }

    /// All coordinate rows, in storage order
    pub fn coordinates(&self) -> impl Iterator<Item = &[usize]> + '_ {
        (0..self.nnz()).map(move |i| self.coordinate(i))
    }

    /// Stored values
    pub fn values(&self) -> &TensorData {
        &self.values
    }

    /// Typed view of the stored values if `T` matches the element type
    pub fn typed_values<T: TensorType>(&self) -> Option<&[T]> {
        T::view(&self.values)
    }

    /// Element type
    pub fn dtype(&self) -> DataType {
        self.values.dtype()
    }

    /// Size of the leading dimension, `None` for rank-0 tensors
    pub fn leading_dim(&self) -> Option<usize> {
        self.dense_shape.first().copied()
    }

    /// Convert this sparse tensor to a dense tensor, zero-filling absent values
    pub fn to_dense(&self) -> Result<DenseTensor> {
        let size = element_count(&self.dense_shape)?;
        let mut data = TensorData::zeros(self.dtype(), size);

        for (i, coordinate) in self.coordinates().enumerate() {
            let offset = coordinate
                .iter()
                .zip(&self.dense_shape)
                .fold(0, |acc, (&index, &dim)| acc * dim + index);
            data.assign(offset, &self.values, i)?;
        }

        DenseTensor::new(data, self.dense_shape.clone())
    }

    /// Approximate memory held by this tensor in bytes
    pub fn memory_usage(&self) -> usize {
        let word = std::mem::size_of::<usize>();
        self.values.memory_usage() + (self.indices.len() + self.dense_shape.len()) * word
    }
}

/// One component value of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// Dense array
    Dense(DenseTensor),

    /// Sparse coordinate list
    Sparse(SparseTensor),
}

impl Tensor {
    /// Storage kind of this tensor
    pub fn kind(&self) -> ComponentKind {
        match self {
            Tensor::Dense(_) => ComponentKind::Dense,
            Tensor::Sparse(_) => ComponentKind::Sparse,
        }
    }

    /// Element type
    pub fn dtype(&self) -> DataType {
        match self {
            Tensor::Dense(t) => t.dtype(),
            Tensor::Sparse(t) => t.dtype(),
        }
    }

    /// Logical shape: the array shape, or the dense shape of a sparse tensor
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Dense(t) => t.shape(),
            Tensor::Sparse(t) => t.dense_shape(),
        }
    }

    /// Size of the leading dimension, `None` when the tensor has rank 0
    pub fn leading_dim(&self) -> Option<usize> {
        self.shape().first().copied()
    }

    /// Borrow as a dense tensor
    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            Tensor::Dense(t) => Some(t),
            Tensor::Sparse(_) => None,
        }
    }

    /// Borrow as a sparse tensor
    pub fn as_sparse(&self) -> Option<&SparseTensor> {
        match self {
            Tensor::Sparse(t) => Some(t),
            Tensor::Dense(_) => None,
        }
    }

    /// Approximate memory held by this tensor in bytes
    pub fn memory_usage(&self) -> usize {
        match self {
            Tensor::Dense(t) => t.memory_usage(),
            Tensor::Sparse(t) => t.memory_usage(),
        }
    }
}

impl From<DenseTensor> for Tensor {
    fn from(tensor: DenseTensor) -> Self {
        Tensor::Dense(tensor)
    }
}

impl From<SparseTensor> for Tensor {
    fn from(tensor: SparseTensor) -> Self {
        Tensor::Sparse(tensor)
    }
}

assert_impl_all!(TensorData: Send, Sync);
assert_impl_all!(Tensor: Send, Sync, Clone);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_slices_concatenate_to_original(values in prop::collection::vec(any::<f64>(), 0..64), cut in 0usize..64) {
            let data = TensorData::Float64(values.clone());
            let cut = cut.min(values.len());
            let mut joined = data.slice(0..cut).unwrap();
            joined.extend_from(&data.slice(cut..values.len()).unwrap()).unwrap();
            prop_assert_eq!(joined.memory_usage(), values.len() * 8);
            prop_assert_eq!(joined.as_bytes(), data.as_bytes());
        }
    }

    #[test]
    fn test_dense_shape_must_match_data() {
        assert!(DenseTensor::from_vec(vec![1i32, 2, 3], vec![2, 2]).is_err());
        let t = DenseTensor::from_vec(vec![1i32, 2, 3, 4], vec![2, 2]).unwrap();
        assert_eq!(t.leading_dim(), Some(2));
        assert_eq!(t.values::<i32>(), Some(&[1, 2, 3, 4][..]));
        assert_eq!(t.values::<i64>(), None);
    }

    #[test]
    fn test_element_count_overflow_rejected() {
        let err = DenseTensor::new(TensorData::Int32(Vec::new()), vec![usize::MAX, 2]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(DenseTensor::new(TensorData::Int32(Vec::new()), vec![0, usize::MAX, 2]).is_ok());

        let st = SparseTensor::from_coo(&[vec![0, 1]], vec![5i32], vec![usize::MAX / 2, 4]).unwrap();
        assert!(st.to_dense().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn test_scalar_has_no_leading_dim() {
        let t = DenseTensor::scalar(7i64);
        assert_eq!(t.ndim(), 0);
        assert_eq!(t.leading_dim(), None);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_sparse_bounds_checked() {
        let err = SparseTensor::from_coo(&[vec![0, 3]], vec![1.0f32], vec![2, 3]).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(SparseTensor::from_coo(&[vec![0]], vec![1.0f32], vec![2, 3]).is_err());
    }

    #[test]
    fn test_sparse_to_dense() {
        let st = SparseTensor::from_coo(&[vec![0, 1], vec![1, 0]], vec![5i32, 6], vec![2, 2]).unwrap();
        let dense = st.to_dense().unwrap();
        assert_eq!(dense.shape(), &[2, 2]);
        assert_eq!(dense.values::<i32>(), Some(&[0, 5, 6, 0][..]));
    }

    #[test]
    fn test_rank_zero_sparse_coordinates() {
        let st = SparseTensor::from_coo(&[vec![], vec![]], vec![1u8, 2], vec![]).unwrap();
        assert_eq!(st.nnz(), 2);
        assert_eq!(st.coordinates().filter(|c| c.is_empty()).count(), 2);
        assert_eq!(st.leading_dim(), None);
    }

    #[test]
    fn test_gather_and_slice() {
        let data = TensorData::String(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(
            data.gather(&[2, 0]).unwrap(),
            TensorData::String(vec![b"c".to_vec(), b"a".to_vec()])
        );
        assert_eq!(data.slice(1..3).unwrap().len(), 2);
        assert!(data.slice(2..4).is_err());
        assert!(data.gather(&[3]).is_err());
    }

    #[test]
    fn test_extend_rejects_other_dtype() {
        let mut data = TensorData::Int32(vec![1]);
        data.extend_from(&TensorData::Int32(vec![2, 3])).unwrap();
        assert_eq!(data, TensorData::Int32(vec![1, 2, 3]));
        assert!(data.extend_from(&TensorData::Int64(vec![4])).is_err());
    }

    #[test]
    fn test_byte_view() {
        let data = TensorData::Int32(vec![1, 2]);
        assert_eq!(data.as_bytes().map(<[u8]>::len), Some(8));
        assert_eq!(data.memory_usage(), 8);
        assert!(TensorData::Boolean(vec![true]).as_bytes().is_none());
    }
}
