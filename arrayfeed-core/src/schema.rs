//! Schema definitions for row-major array storage

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type for attribute cells
///
/// Only fixed-width numeric types are representable: every cell of every
/// attribute must map onto a tensor element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
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
}

impl DataType {
    /// Get the size of one cell of this type in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int8 => write!(f, "Int8"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::UInt8 => write!(f, "UInt8"),
            DataType::UInt16 => write!(f, "UInt16"),
            DataType::UInt32 => write!(f, "UInt32"),
            DataType::UInt64 => write!(f, "UInt64"),
            DataType::Float32 => write!(f, "Float32"),
            DataType::Float64 => write!(f, "Float64"),
        }
    }
}

/// A dimension of an array domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Name of the dimension
    pub name: String,

    /// Number of coordinates along this dimension
    pub extent: usize,
}

impl Dimension {
    /// Create a new dimension
    pub fn new(name: &str, extent: usize) -> Self {
        Self {
            name: name.to_string(),
            extent,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.extent)
    }
}

/// A named attribute holding one cell value per array cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Name of the attribute
    pub name: String,

    /// Data type of the attribute's cells
    pub dtype: DataType,
}

impl Attribute {
    /// Create a new attribute
    pub fn new(name: &str, dtype: DataType) -> Self {
        Self {
            name: name.to_string(),
            dtype,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.dtype)
    }
}

/// A schema describing an array's domain and attributes
///
/// The first dimension is the row dimension: reads, windowing and batching
/// all slice the array along it. Remaining dimensions form the row shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySchema {
    /// Dimensions of the array domain, row dimension first
    dims: Vec<Dimension>,

    /// Attributes stored in each cell
    attrs: Vec<Attribute>,

    /// Whether the array stores only non-empty cells
    sparse: bool,

    /// Attribute indices by name for faster lookup
    #[serde(skip)]
    attr_indices: HashMap<String, usize>,
}

impl ArraySchema {
    fn new(dims: Vec<Dimension>, attrs: Vec<Attribute>, sparse: bool) -> Result<Self> {
        if dims.is_empty() {
            return Err(Error::InvalidArgument(
                "array schema requires at least one dimension".to_string(),
            ));
        }
        if attrs.is_empty() {
            return Err(Error::InvalidArgument(
                "array schema requires at least one attribute".to_string(),
            ));
        }
        if let Some(dim) = dims.iter().find(|d| d.extent == 0) {
            return Err(Error::InvalidArgument(format!(
                "dimension {} has zero extent",
                dim.name
            )));
        }

        let mut attr_indices = HashMap::with_capacity(attrs.len());
        for (i, attr) in attrs.iter().enumerate() {
            if attr_indices.insert(attr.name.clone(), i).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "duplicate attribute name: {}",
                    attr.name
                )));
            }
        }

        Ok(Self {
            dims,
            attrs,
            sparse,
            attr_indices,
        })
    }

    /// Create a dense array schema
    pub fn dense(dims: Vec<Dimension>, attrs: Vec<Attribute>) -> Result<Self> {
        Self::new(dims, attrs, false)
    }

    /// Create a sparse array schema
    pub fn sparse(dims: Vec<Dimension>, attrs: Vec<Attribute>) -> Result<Self> {
        Self::new(dims, attrs, true)
    }

    /// Check whether this schema is sparse
    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Get all dimensions, row dimension first
    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Get a dimension by index
    pub fn dim(&self, index: usize) -> &Dimension {
        &self.dims[index]
    }

    /// Get the extents of all dimensions
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.extent).collect()
    }

    /// Get the number of rows (extent of the first dimension)
    pub fn row_count(&self) -> usize {
        self.dims[0].extent
    }

    /// Get the extents of all dimensions after the row dimension
    pub fn row_shape(&self) -> Vec<usize> {
        self.dims[1..].iter().map(|d| d.extent).collect()
    }

    /// Get the number of cells in a single row
    pub fn cells_per_row(&self) -> usize {
        self.row_shape().iter().product()
    }

    /// Get all attributes
    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Get an attribute by name
    pub fn attr(&self, name: &str) -> Result<&Attribute> {
        let index = self.attr_index(name)?;
        Ok(&self.attrs[index])
    }

    /// Get the index of an attribute by name
    pub fn attr_index(&self, name: &str) -> Result<usize> {
        self.attr_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
    }

    /// Get the names of all attributes in schema order
    pub fn attr_names(&self) -> Vec<String> {
        self.attrs.iter().map(|a| a.name.clone()).collect()
    }

    /// Serialize this schema to a binary format
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Serialization)
    }

    /// Deserialize a schema from a binary format
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut schema: Self = bincode::deserialize(data).map_err(Error::Serialization)?;

        // Rebuild the attribute indices
        schema.attr_indices.clear();
        for (i, attr) in schema.attrs.iter().enumerate() {
            schema.attr_indices.insert(attr.name.clone(), i);
        }

        Ok(schema)
    }
}

impl fmt::Display for ArraySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.sparse { "sparse" } else { "dense" };
        write!(f, "ArraySchema({kind}, dims=[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "], attrs=[")?;
        for (i, attr) in self.attrs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{attr}")?;
        }
        write!(f, "])")
    }
}
