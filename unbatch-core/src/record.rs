//! Records: ordered tuples of tensor components
//!
//! The same type carries both a batch (components stacked along a shared
//! leading dimension) and an element (one record sliced out of a batch).

use std::fmt;

use crate::error::{Error, Result};
use crate::schema::{ComponentSpec, ElementSpec, StaticShape};
use crate::tensor::Tensor;

/// An ordered tuple of tensor components
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Components in order
    components: Vec<Tensor>,
}

impl Record {
    /// Create a new record with the given components
    pub fn new(components: Vec<Tensor>) -> Self {
        Self { components }
    }

    /// Get the number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if this record has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get a component by index
    pub fn component(&self, index: usize) -> Result<&Tensor> {
        self.components.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            len: self.components.len(),
        })
    }

    /// Get a component by name, resolved through `spec`
    pub fn component_by_name(&self, spec: &ElementSpec, name: &str) -> Result<&Tensor> {
        self.component(spec.index_of(name)?)
    }

    /// Get all components
    pub fn components(&self) -> &[Tensor] {
        &self.components
    }

    /// Consume the record, returning its components
    pub fn into_components(self) -> Vec<Tensor> {
        self.components
    }

    /// Leading-dimension size of every component, `None` for rank-0 ones
    pub fn leading_dims(&self) -> Vec<Option<usize>> {
        self.components.iter().map(Tensor::leading_dim).collect()
    }

    /// Describe this record with fully known static shapes
    ///
    /// Components are named `component_<i>`.
    pub fn spec(&self) -> ElementSpec {
        let components = self
            .components
            .iter()
            .enumerate()
            .map(|(i, tensor)| ComponentSpec {
                name: format!("component_{}", i),
                kind: tensor.kind(),
                dtype: tensor.dtype(),
                shape: StaticShape::fixed(tensor.shape()),
            })
            .collect();
        ElementSpec::new(components)
    }

    /// Calculate the total memory usage of this record in bytes
    pub fn memory_usage(&self) -> usize {
        self.components.iter().map(Tensor::memory_usage).sum()
    }
}

impl FromIterator<Tensor> for Record {
    fn from_iter<I: IntoIterator<Item = Tensor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record(")?;
        for (i, tensor) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}{:?}", tensor.kind(), tensor.dtype(), tensor.shape())?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComponentKind, DataType};
    use crate::tensor::{DenseTensor, SparseTensor};

    fn sample() -> Record {
        Record::new(vec![
            DenseTensor::from_vec(vec![1i32, 2, 3], vec![3]).unwrap().into(),
            SparseTensor::from_coo(&[vec![2, 0]], vec![1.5f64], vec![3, 4]).unwrap().into(),
            DenseTensor::scalar(9i64).into(),
        ])
    }

    #[test]
    fn test_leading_dims() {
        assert_eq!(sample().leading_dims(), vec![Some(3), Some(3), None]);
    }

    #[test]
    fn test_inferred_spec() {
        let spec = sample().spec();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.component(1).unwrap().kind, ComponentKind::Sparse);
        assert_eq!(spec.component(1).unwrap().shape, StaticShape::fixed(&[3, 4]));
        assert_eq!(spec.component(2).unwrap().shape, StaticShape::scalar());
        assert_eq!(spec.dtypes(), vec![DataType::Int32, DataType::Float64, DataType::Int64]);
    }

    #[test]
    fn test_component_lookup() {
        let record = sample();
        let spec = record.spec();
        assert!(record.component(3).is_err());
        assert_eq!(
            record.component_by_name(&spec, "component_2").unwrap().dtype(),
            DataType::Int64
        );
        assert_eq!(record.to_string(), "Record(dense int32[3], sparse float64[3, 4], dense int64[])");
    }
}
