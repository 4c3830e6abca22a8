//! Buffered tensor generation over one array

use crate::array::{ArrayRead, ReadQuery, RowRange};
use crate::csr::CsrBuffer;
use crate::error::{Error, Result};
use crate::tensor::{DenseTensor, Tensor};

/// Lazy per-attribute tensors for one extraction, drained once per step
pub type TensorIter<'a> = Box<dyn Iterator<Item = Result<Tensor>> + 'a>;

/// Turns buffered row windows of one array into per-attribute tensors
///
/// A generator owns the read state for a single array. [`read_buffer`]
/// replaces the buffer with freshly fetched rows; [`iter_tensors`] extracts
/// a buffer-local row range as one tensor per bound attribute, in attribute
/// order. Extraction is only valid after at least one fetch.
///
/// [`read_buffer`]: Self::read_buffer
/// [`iter_tensors`]: Self::iter_tensors
pub trait TensorGenerator: Send {
    /// Fetch `read_slice` from the array, replacing the current buffer
    fn read_buffer(&mut self, read_slice: RowRange) -> Result<()>;

    /// Extract tensors for a row range relative to the current buffer
    ///
    /// Fails with [`Error::BufferNotRead`] when no fetch has happened yet.
    fn iter_tensors(&self, extract_slice: RowRange) -> Result<TensorIter<'_>>;
}

/// Generator for dense arrays: buffered rows pass through unchanged
pub struct DenseTensorGenerator<'a> {
    query: ReadQuery<'a>,
    row_shape: Vec<usize>,
    cells_per_row: usize,
    buffer: Option<DenseBuffer>,
}

struct DenseBuffer {
    rows: usize,
    tensors: Vec<DenseTensor>,
}

impl<'a> DenseTensorGenerator<'a> {
    /// Bind a dense array and attribute subset
    pub fn new(array: &'a dyn ArrayRead, attrs: &[String]) -> Result<Self> {
        let schema = array.schema();
        let row_shape = schema.row_shape();
        let cells_per_row = schema.cells_per_row();

        Ok(Self {
            query: ReadQuery::new(array, attrs)?,
            row_shape,
            cells_per_row,
            buffer: None,
        })
    }
}

impl TensorGenerator for DenseTensorGenerator<'_> {
    fn read_buffer(&mut self, read_slice: RowRange) -> Result<()> {
        let slice = self.query.read(read_slice)?;
        if slice.values.len() != self.query.attrs().len() {
            return Err(Error::StorageRead(format!(
                "backend returned {} attribute buffers, expected {}",
                slice.values.len(),
                self.query.attrs().len()
            )));
        }

        let rows = read_slice.len();
        let mut tensors = Vec::with_capacity(slice.values.len());
        for values in slice.values {
            if values.len() != rows * self.cells_per_row {
                return Err(Error::StorageRead(format!(
                    "backend returned {} cells for {} rows of {} cells each",
                    values.len(),
                    rows,
                    self.cells_per_row
                )));
            }

            let mut shape = Vec::with_capacity(self.row_shape.len() + 1);
            shape.push(rows);
            shape.extend_from_slice(&self.row_shape);
            tensors.push(DenseTensor::new(values, shape)?);
        }

        tracing::trace!(rows, read_slice = %read_slice, "refilled dense buffer");
        self.buffer = Some(DenseBuffer { rows, tensors });
        Ok(())
    }

    fn iter_tensors(&self, extract_slice: RowRange) -> Result<TensorIter<'_>> {
        let buf = self.buffer.as_ref().ok_or(Error::BufferNotRead)?;
        if extract_slice.stop > buf.rows {
            return Err(Error::IndexOutOfBounds);
        }

        Ok(Box::new(buf.tensors.iter().map(
            move |tensor| -> Result<Tensor> {
                let rows = tensor.slice_rows(extract_slice.start..extract_slice.stop)?;
                Ok(Tensor::Dense(rows))
            },
        )))
    }
}

/// Generator for sparse arrays: buffers rows compressed by rebased row
///
/// Only two-dimensional sparse schemas are supported. Each fetch rebases the
/// global row coordinates against the fetch start and compresses the cells
/// per attribute, so extraction slices rows in constant time and emits
/// coordinates local to the extraction window.
pub struct SparseTensorGenerator<'a> {
    query: ReadQuery<'a>,
    ncols: usize,
    buffer: Option<SparseBuffer>,
}

struct SparseBuffer {
    rows: usize,
    csrs: Vec<CsrBuffer>,
}

impl<'a> SparseTensorGenerator<'a> {
    /// Bind a sparse array and attribute subset
    ///
    /// Fails with [`Error::SchemaUnsupported`] for any dimensionality other
    /// than two, before any state is created.
    pub fn new(array: &'a dyn ArrayRead, attrs: &[String]) -> Result<Self> {
        let schema = array.schema();
        if schema.ndim() != 2 {
            return Err(Error::SchemaUnsupported {
                ndim: schema.ndim(),
            });
        }
        let ncols = schema.dim(1).extent;
        tracing::debug!(rows = %schema.dim(0), cols = %schema.dim(1), "bound sparse array");

        Ok(Self {
            query: ReadQuery::new(array, attrs)?,
            ncols,
            buffer: None,
        })
    }
}

impl TensorGenerator for SparseTensorGenerator<'_> {
    fn read_buffer(&mut self, read_slice: RowRange) -> Result<()> {
        let slice = self.query.read(read_slice)?;
        if slice.values.len() != self.query.attrs().len() {
            return Err(Error::StorageRead(format!(
                "backend returned {} attribute buffers, expected {}",
                slice.values.len(),
                self.query.attrs().len()
            )));
        }
        let coords = slice.coords.ok_or_else(|| {
            Error::StorageRead("sparse read returned no coordinates".to_string())
        })?;

        let rows = read_slice.len();
        let csrs = slice
            .values
            .into_iter()
            .map(|values| {
                CsrBuffer::from_coo(
                    values,
                    &coords.rows,
                    &coords.cols,
                    read_slice.start as u64,
                    rows,
                    self.ncols,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(
            rows,
            nnz = coords.rows.len(),
            read_slice = %read_slice,
            "refilled sparse buffer"
        );
        self.buffer = Some(SparseBuffer { rows, csrs });
        Ok(())
    }

    fn iter_tensors(&self, extract_slice: RowRange) -> Result<TensorIter<'_>> {
        let buf = self.buffer.as_ref().ok_or(Error::BufferNotRead)?;
        if extract_slice.stop > buf.rows {
            return Err(Error::IndexOutOfBounds);
        }

        Ok(Box::new(buf.csrs.iter().map(
            move |csr| -> Result<Tensor> {
                let tensor = csr.slice_rows(extract_slice.start..extract_slice.stop)?;
                Ok(Tensor::Sparse(tensor))
            },
        )))
    }
}

/// Build the generator matching an array's sparsity, dispatched once
pub fn tensor_generator_for<'a>(
    array: &'a dyn ArrayRead,
    attrs: &[String],
) -> Result<Box<dyn TensorGenerator + 'a>> {
    if array.schema().is_sparse() {
        Ok(Box::new(SparseTensorGenerator::new(array, attrs)?))
    } else {
        Ok(Box::new(DenseTensorGenerator::new(array, attrs)?))
    }
}
