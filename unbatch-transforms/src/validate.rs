//! Static and dynamic validation of batches before they are split
//!
//! [`UnbatchPlan::new`] is the construction-time path: it only looks at the
//! source's [`ElementSpec`] and rejects specs whose statically known leading
//! dimensions disagree. [`UnbatchPlan::validate`] is the consumption-time path
//! run once per batch, covering everything the static spec could not prove.

use std::fmt::Write as _;
use std::sync::Arc;

use unbatch_core::error::{Error, Result};
use unbatch_core::schema::{Dim, ElementSpec};
use unbatch_core::Record;

/// The result of checking a batch spec: the element spec and what is known
/// about the batch dimension
#[derive(Debug, Clone)]
pub struct UnbatchPlan {
    /// Spec of incoming batches
    input_spec: Arc<ElementSpec>,

    /// Spec of produced elements
    element_spec: Arc<ElementSpec>,

    /// Batch size, if any component fixes it statically
    batch_dim: Dim,

    /// Whether some component's leading dimension is only known at runtime
    deferred: bool,

    /// Whether batches are checked against `input_spec` kinds, dtypes and shapes
    check_element_spec: bool,
}

impl UnbatchPlan {
    /// Check a batch spec and derive the element spec
    pub fn new(input_spec: Arc<ElementSpec>) -> Result<Self> {
        if input_spec.is_empty() {
            return Err(Error::SchemaMismatch(
                "Cannot unbatch records without components".into(),
            ));
        }

        let mut known = Vec::new();
        let mut deferred = false;
        for component in input_spec.components() {
            match component.shape.dims() {
                None | Some([Dim::Unknown, ..]) => deferred = true,
                Some([]) => {
                    return Err(Error::SchemaMismatch(format!(
                        "Cannot unbatch scalar component '{}': every component needs a leading dimension",
                        component.name
                    )));
                }
                Some([Dim::Known(size), ..]) => known.push((component.name.as_str(), *size)),
            }
        }

        if known.windows(2).any(|pair| pair[0].1 != pair[1].1) {
            return Err(Error::SchemaMismatch(format!(
                "Components have different leading dimension sizes: {}",
                describe_sizes(known.iter().map(|&(name, size)| (name, Some(size))))
            )));
        }

        let components = input_spec
            .components()
            .iter()
            .map(|c| Ok(c.with_shape(c.shape.without_leading()?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            element_spec: Arc::new(ElementSpec::new(components)),
            batch_dim: known.first().map_or(Dim::Unknown, |&(_, size)| Dim::Known(size)),
            deferred,
            check_element_spec: true,
            input_spec,
        })
    }

    /// Enable or disable per-batch kind, dtype and shape checks
    pub fn with_element_spec_check(mut self, enabled: bool) -> Self {
        self.check_element_spec = enabled;
        self
    }

    /// Spec of incoming batches
    pub fn input_spec(&self) -> &Arc<ElementSpec> {
        &self.input_spec
    }

    /// Spec of produced elements
    pub fn element_spec(&self) -> &Arc<ElementSpec> {
        &self.element_spec
    }

    /// Statically known batch size
    pub fn batch_dim(&self) -> Dim {
        self.batch_dim
    }

    /// Whether leading-dimension equality can only be decided on real data
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Check a batch and return the number of elements it holds
    pub fn validate(&self, batch: &Record) -> Result<usize> {
        if batch.len() != self.input_spec.len() {
            return Err(Error::TypeMismatch(format!(
                "Batch has {} components, expected {}",
                batch.len(),
                self.input_spec.len()
            )));
        }

        if self.check_element_spec {
            self.check_against_spec(batch)?;
        }

        let leading = batch.leading_dims();
        let size = leading.first().copied().flatten();
        if size.is_none() || leading.iter().any(|&dim| dim != size) {
            let names = self.input_spec.components().iter().map(|c| c.name.as_str());
            return Err(Error::InvalidArgument(format!(
                "Input element components have different leading dimension sizes: {}",
                describe_sizes(names.zip(leading.iter().copied()))
            )));
        }

        let size = size.unwrap_or_default();
        if let Some(expected) = self.batch_dim.known() {
            if size != expected {
                return Err(Error::InvalidArgument(format!(
                    "Batch has leading dimension {}, but the spec declares {}",
                    size, expected
                )));
            }
        }
        Ok(size)
    }

    fn check_against_spec(&self, batch: &Record) -> Result<()> {
        for (spec, tensor) in self.input_spec.components().iter().zip(batch.components()) {
            if spec.kind != tensor.kind() || spec.dtype != tensor.dtype() {
                return Err(Error::TypeMismatch(format!(
                    "Component '{}' is {} {}, expected {} {}",
                    spec.name,
                    tensor.kind(),
                    tensor.dtype(),
                    spec.kind,
                    spec.dtype
                )));
            }

            if !spec.shape.admits(tensor.shape()) {
                return Err(Error::InvalidArgument(format!(
                    "Component '{}' has shape {:?}, incompatible with declared shape {}",
                    spec.name,
                    tensor.shape(),
                    spec.shape
                )));
            }
        }
        Ok(())
    }
}

/// Render `name=size` pairs, marking components without a leading dimension
fn describe_sizes<'a>(sizes: impl Iterator<Item = (&'a str, Option<usize>)>) -> String {
    let mut out = String::new();
    for (i, (name, size)) in sizes.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match size {
            Some(size) => {
                let _ = write!(out, "{}={}", name, size);
            }
            None => {
                let _ = write!(out, "{}=<scalar>", name);
            }
        }
    }
    out
}
