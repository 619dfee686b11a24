//! Static descriptions of record components: element types, shapes and kinds

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Element type of a tensor's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type (one byte per value)
    Boolean,

    /// 8-bit signed integer
    Int8,

    /// 16-bit signed integer
    Int16,

    /// 32-bit signed integer
    Int32,

    /// 64-bit signed integer
    Int64,

    /// 8-bit unsigned integer
    UInt8,

    /// 16-bit unsigned integer
    UInt16,

    /// 32-bit unsigned integer
    UInt32,

    /// 64-bit unsigned integer
    UInt64,

    /// 32-bit floating point
    Float32,

    /// 64-bit floating point
    Float64,

    /// Variable-length byte string
    String,
}

impl DataType {
    /// Get the size of this type in bytes, or 0 for variable-size types
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Boolean | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
            DataType::String => 0,
        }
    }

    /// Check if this type is a fixed-width type
    pub fn is_fixed_width(&self) -> bool {
        !matches!(self, DataType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "bool",
            DataType::Int8 => "int8",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::UInt32 => "uint32",
            DataType::UInt64 => "uint64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::String => "string",
        };
        f.write_str(name)
    }
}

/// Static knowledge about the size of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    /// Size is fixed ahead of time
    Known(usize),

    /// Size is only discovered when data arrives
    Unknown,
}

impl Dim {
    /// The size, if statically known
    pub fn known(self) -> Option<usize> {
        match self {
            Dim::Known(size) => Some(size),
            Dim::Unknown => None,
        }
    }

    /// Whether an observed size satisfies this dimension
    pub fn admits(self, size: usize) -> bool {
        match self {
            Dim::Known(expected) => expected == size,
            Dim::Unknown => true,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Known(size) => write!(f, "{}", size),
            Dim::Unknown => f.write_str("?"),
        }
    }
}

/// Static shape of a component, possibly with unknown rank or dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StaticShape {
    /// Rank is not known ahead of time
    Unknown,

    /// Rank is known; individual dimensions may still be unknown
    Known(Vec<Dim>),
}

impl StaticShape {
    /// A shape with every dimension known
    pub fn fixed(dims: &[usize]) -> Self {
        StaticShape::Known(dims.iter().copied().map(Dim::Known).collect())
    }

    /// A rank-0 shape
    pub fn scalar() -> Self {
        StaticShape::Known(Vec::new())
    }

    /// A shape of known rank where every dimension is unknown
    pub fn unknown_dims(rank: usize) -> Self {
        StaticShape::Known(vec![Dim::Unknown; rank])
    }

    /// Rank of this shape, if known
    pub fn rank(&self) -> Option<usize> {
        match self {
            StaticShape::Unknown => None,
            StaticShape::Known(dims) => Some(dims.len()),
        }
    }

    /// Dimensions of this shape, if the rank is known
    pub fn dims(&self) -> Option<&[Dim]> {
        match self {
            StaticShape::Unknown => None,
            StaticShape::Known(dims) => Some(dims),
        }
    }

    /// Shape with the leading dimension removed. Unknown rank stays unknown.
    pub fn without_leading(&self) -> Result<Self> {
        match self {
            StaticShape::Unknown => Ok(StaticShape::Unknown),
            StaticShape::Known(dims) if dims.is_empty() => Err(Error::SchemaMismatch(
                "Cannot remove the leading dimension of a scalar shape".into(),
            )),
            StaticShape::Known(dims) => Ok(StaticShape::Known(dims[1..].to_vec())),
        }
    }

    /// Shape with a new leading dimension prepended
    pub fn with_leading(&self, leading: Dim) -> Self {
        match self {
            StaticShape::Unknown => StaticShape::Unknown,
            StaticShape::Known(dims) => {
                let mut new_dims = Vec::with_capacity(dims.len() + 1);
                new_dims.push(leading);
                new_dims.extend_from_slice(dims);
                StaticShape::Known(new_dims)
            }
        }
    }

    /// Check whether an observed shape is admitted by this static shape
    pub fn admits(&self, shape: &[usize]) -> bool {
        match self {
            StaticShape::Unknown => true,
            StaticShape::Known(dims) => {
                dims.len() == shape.len()
                    && dims.iter().zip(shape).all(|(dim, &size)| dim.admits(size))
            }
        }
    }
}

impl fmt::Display for StaticShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticShape::Unknown => f.write_str("<unknown>"),
            StaticShape::Known(dims) => {
                write!(f, "[")?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", dim)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// How a component stores its values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Full rectangular array
    Dense,

    /// Coordinate list of indices, values and an overall dense shape
    Sparse,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentKind::Dense => f.write_str("dense"),
            ComponentKind::Sparse => f.write_str("sparse"),
        }
    }
}

/// Static description of one component of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentSpec {
    /// Name of the component
    pub name: String,

    /// Storage kind
    pub kind: ComponentKind,

    /// Element type of the values
    pub dtype: DataType,

    /// Static shape; for sparse components this is the shape of `dense_shape`
    pub shape: StaticShape,
}

impl ComponentSpec {
    /// Describe a dense component
    pub fn dense(name: &str, dtype: DataType, shape: StaticShape) -> Self {
        Self {
            name: name.to_string(),
            kind: ComponentKind::Dense,
            dtype,
            shape,
        }
    }

    /// Describe a sparse component
    pub fn sparse(name: &str, dtype: DataType, shape: StaticShape) -> Self {
        Self {
            name: name.to_string(),
            kind: ComponentKind::Sparse,
            dtype,
            shape,
        }
    }

    /// Get the name of this component
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of this spec with a different static shape
    pub fn with_shape(&self, shape: StaticShape) -> Self {
        Self {
            shape,
            ..self.clone()
        }
    }
}

impl fmt::Display for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}{}", self.name, self.kind, self.dtype, self.shape)
    }
}

/// Ordered description of every component of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Components in record order
    components: Vec<ComponentSpec>,

    /// Component indices by name for faster lookup
    #[serde(skip)]
    indices: HashMap<String, usize>,
}

impl ElementSpec {
    /// Create a new spec with the given components
    pub fn new(components: Vec<ComponentSpec>) -> Self {
        let indices = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Self { components, indices }
    }

    /// Get all component specs
    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    /// Get a component spec by index
    pub fn component(&self, index: usize) -> Option<&ComponentSpec> {
        self.components.get(index)
    }

    /// Get the index of a component by name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidArgument(format!("Component not found: {}", name)))
    }

    /// Get the number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if this spec has no components
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Element types of every component, in order
    pub fn dtypes(&self) -> Vec<DataType> {
        self.components.iter().map(|c| c.dtype).collect()
    }

    /// Parse a spec from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        // The name index is not serialized
        Ok(Self::new(spec.components))
    }
}

impl fmt::Display for ElementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", component)?;
        }
        write!(f, ")")
    }
}
