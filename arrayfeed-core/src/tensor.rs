//! Tensor values produced by batch extraction

use crate::error::{Error, Result};
use crate::schema::DataType;
use crate::values::ValueBuffer;

/// A dense row-major tensor
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTensor {
    /// Shape of the tensor, row dimension first
    shape: Vec<usize>,

    /// Cell values in row-major order
    values: ValueBuffer,
}

impl DenseTensor {
    /// Create a tensor over an existing buffer
    pub fn new(values: ValueBuffer, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "buffer length {} does not match shape product {}",
                values.len(),
                expected
            )));
        }

        Ok(Self { shape, values })
    }

    /// Get the shape of this tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this tensor is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the element data type
    pub fn dtype(&self) -> DataType {
        self.values.dtype()
    }

    /// Get the backing values
    pub fn values(&self) -> &ValueBuffer {
        &self.values
    }

    /// Slice a range of rows out of the leading dimension, zero-copy
    pub fn slice_rows(&self, rows: std::ops::Range<usize>) -> Result<DenseTensor> {
        if self.shape.is_empty() || rows.start > rows.end || rows.end > self.shape[0] {
            return Err(Error::IndexOutOfBounds);
        }

        let cells_per_row: usize = self.shape[1..].iter().product();
        let values = self
            .values
            .slice(rows.start * cells_per_row, rows.len() * cells_per_row)?;

        let mut shape = self.shape.clone();
        shape[0] = rows.len();
        DenseTensor::new(values, shape)
    }
}

/// A two-dimensional sparse tensor in coordinate format
///
/// Coordinates are stored flat as `(nnz, 2)` row-major pairs, batch-local:
/// row coordinates count from the start of the extraction window, not from
/// the start of the array.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseTensor {
    /// Non-empty cell values
    values: ValueBuffer,

    /// Flat `[row, col]` pairs, one per value
    coords: Vec<u64>,

    /// Shape of the dense tensor this represents
    dense_shape: Vec<usize>,
}

impl SparseTensor {
    /// Create a sparse tensor from values and flat coordinate pairs
    pub fn new(values: ValueBuffer, coords: Vec<u64>, dense_shape: Vec<usize>) -> Result<Self> {
        if dense_shape.len() != 2 {
            return Err(Error::InvalidArgument(format!(
                "sparse tensors are 2-dimensional, got shape of {} dims",
                dense_shape.len()
            )));
        }
        if coords.len() != values.len() * 2 {
            return Err(Error::InvalidArgument(
                "coordinate length must be twice the value count".to_string(),
            ));
        }
        for pair in coords.chunks_exact(2) {
            if pair[0] as usize >= dense_shape[0] || pair[1] as usize >= dense_shape[1] {
                return Err(Error::IndexOutOfBounds);
            }
        }

        Ok(Self {
            values,
            coords,
            dense_shape,
        })
    }

    /// Get the number of non-empty cells
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Get the shape of the dense tensor this represents
    pub fn dense_shape(&self) -> &[usize] {
        &self.dense_shape
    }

    /// Get the element data type
    pub fn dtype(&self) -> DataType {
        self.values.dtype()
    }

    /// Get the non-empty cell values
    pub fn values(&self) -> &ValueBuffer {
        &self.values
    }

    /// Get the flat `[row, col]` coordinate pairs
    pub fn coords(&self) -> &[u64] {
        &self.coords
    }

    /// Scatter this tensor into a dense one, empty cells zero-filled
    pub fn to_dense(&self) -> Result<DenseTensor> {
        let cell = self.values.dtype().size_bytes();
        let cols = self.dense_shape[1];
        let mut bytes = vec![0u8; self.dense_shape[0] * cols * cell];

        let src = self.values.bytes();
        for (i, pair) in self.coords.chunks_exact(2).enumerate() {
            let cell_index = pair[0] as usize * cols + pair[1] as usize;
            bytes[cell_index * cell..(cell_index + 1) * cell]
                .copy_from_slice(&src[i * cell..(i + 1) * cell]);
        }

        let values = ValueBuffer::from_bytes(self.values.dtype(), &bytes)?;
        DenseTensor::new(values, self.dense_shape.clone())
    }
}

/// A tensor extracted for one attribute of one batch
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// Dense row-major tensor
    Dense(DenseTensor),

    /// Sparse coordinate-format tensor
    Sparse(SparseTensor),
}

impl Tensor {
    /// Get the dense shape of this tensor
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Dense(t) => t.shape(),
            Tensor::Sparse(t) => t.dense_shape(),
        }
    }

    /// Get the element data type
    pub fn dtype(&self) -> DataType {
        match self {
            Tensor::Dense(t) => t.dtype(),
            Tensor::Sparse(t) => t.dtype(),
        }
    }

    /// Get the dense tensor, if this is one
    pub fn as_dense(&self) -> Option<&DenseTensor> {
        match self {
            Tensor::Dense(t) => Some(t),
            Tensor::Sparse(_) => None,
        }
    }

    /// Get the sparse tensor, if this is one
    pub fn as_sparse(&self) -> Option<&SparseTensor> {
        match self {
            Tensor::Sparse(t) => Some(t),
            Tensor::Dense(_) => None,
        }
    }
}
