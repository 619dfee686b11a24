//! Core records, tensors and schema abstractions for unbatch pipelines
//!
//! This crate provides the data model shared by every stage: element types
//! and static shapes, dense and sparse tensors, records, and the trait an
//! upstream batch producer implements.

#![warn(missing_docs)]

pub mod error;
pub mod record;
pub mod schema;
pub mod source;
pub mod tensor;
pub mod transform;

// Re-export key types for convenience
pub use error::{Error, Result};
pub use record::Record;
pub use schema::{ComponentKind, ComponentSpec, DataType, Dim, ElementSpec, StaticShape};
pub use source::{BatchSource, InMemorySource, IterSource};
pub use tensor::{DenseTensor, SparseTensor, Tensor, TensorData, TensorType};
pub use transform::RecordTransform;
