//! Streaming unbatch transformation
//!
//! Turns a stream of batches, records whose components share a leading batch
//! dimension, into a stream of the individual elements, preserving order.
//! Construction checks what the batch spec can prove statically; every batch
//! is then checked once at runtime before any of its elements are emitted.

#![warn(missing_docs)]

pub mod config;
pub mod shared;
pub mod slice;
pub mod stream;
pub mod unbatch;
pub mod validate;

pub use config::{ErrorPolicy, SparseSelection, UnbatchConfig};
pub use shared::SharedUnbatch;
pub use slice::{slice_record, PreparedBatch};
pub use stream::UnbatchStream;
pub use unbatch::{unbatch, Unbatch, UnbatchOp};
pub use validate::UnbatchPlan;
