//! Construction-time contract for record transformations

use std::sync::Arc;

use crate::error::Result;
use crate::schema::ElementSpec;

/// A transformation that can describe its output before any data flows
pub trait RecordTransform: Send + Sync {
    /// Get the output spec for this transform when applied to the given input spec
    ///
    /// Fails when the input spec alone proves the transform cannot succeed.
    fn output_spec(&self, input: &ElementSpec) -> Result<Arc<ElementSpec>>;
}
