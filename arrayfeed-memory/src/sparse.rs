//! Sparse in-memory arrays

use arrayfeed_core::{
    ArrayRead, ArraySchema, ArraySlice, Error, Result, RowRange, SparseCoords, ValueBuffer,
};

/// A sparse array held in memory as coordinate/value tuples
///
/// Cells are stored unordered, one coordinate vector per dimension. Any
/// dimensionality can be stored, but reads are served for two-dimensional
/// schemas only; the read carries global row and column coordinates
/// alongside the attribute values.
pub struct SparseMemoryArray {
    schema: ArraySchema,
    coords: Vec<Vec<u64>>,
    values: Vec<ValueBuffer>,
}

impl SparseMemoryArray {
    /// Create an array over owned cell tuples
    ///
    /// `coords` holds one vector per schema dimension; all coordinate
    /// vectors and all attribute buffers pair up element-wise, one entry
    /// per non-empty cell.
    pub fn new(
        schema: ArraySchema,
        coords: Vec<Vec<u64>>,
        values: Vec<ValueBuffer>,
    ) -> Result<Self> {
        if !schema.is_sparse() {
            return Err(Error::InvalidArgument(
                "sparse array requires a sparse schema".to_string(),
            ));
        }
        if coords.len() != schema.ndim() {
            return Err(Error::InvalidArgument(format!(
                "{} coordinate vectors for {} dimensions",
                coords.len(),
                schema.ndim()
            )));
        }

        let nnz = coords[0].len();
        for (dim, dim_coords) in schema.dims().iter().zip(&coords) {
            if dim_coords.len() != nnz {
                return Err(Error::InvalidArgument(format!(
                    "dimension {}: {} coordinates for {} cells",
                    dim.name,
                    dim_coords.len(),
                    nnz
                )));
            }
            if dim_coords.iter().any(|&c| c as usize >= dim.extent) {
                return Err(Error::IndexOutOfBounds);
            }
        }

        if values.len() != schema.attrs().len() {
            return Err(Error::InvalidArgument(format!(
                "{} attribute buffers for {} schema attributes",
                values.len(),
                schema.attrs().len()
            )));
        }
        for (attr, buffer) in schema.attrs().iter().zip(&values) {
            if buffer.dtype() != attr.dtype {
                return Err(Error::InvalidArgument(format!(
                    "attribute {}: buffer dtype {} does not match schema dtype {}",
                    attr.name,
                    buffer.dtype(),
                    attr.dtype
                )));
            }
            if buffer.len() != nnz {
                return Err(Error::InvalidArgument(format!(
                    "attribute {}: {} values for {} cells",
                    attr.name,
                    buffer.len(),
                    nnz
                )));
            }
        }

        Ok(Self {
            schema,
            coords,
            values,
        })
    }

    /// Get the number of stored cells
    pub fn nnz(&self) -> usize {
        self.coords[0].len()
    }
}

impl ArrayRead for SparseMemoryArray {
    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn read(&self, rows: RowRange, attrs: &[String]) -> Result<ArraySlice> {
        if self.schema.ndim() != 2 {
            return Err(Error::SchemaUnsupported {
                ndim: self.schema.ndim(),
            });
        }
        if rows.start > rows.stop || rows.stop > self.schema.row_count() {
            return Err(Error::IndexOutOfBounds);
        }

        let selected: Vec<usize> = self.coords[0]
            .iter()
            .enumerate()
            .filter(|(_, &row)| rows.contains(row as usize))
            .map(|(i, _)| i)
            .collect();

        let values = attrs
            .iter()
            .map(|name| {
                let index = self.schema.attr_index(name)?;
                gather(&self.values[index], &selected)
            })
            .collect::<Result<Vec<_>>>()?;

        let coords = SparseCoords {
            rows: selected.iter().map(|&i| self.coords[0][i]).collect(),
            cols: selected.iter().map(|&i| self.coords[1][i]).collect(),
        };

        tracing::trace!(rows = %rows, nnz = selected.len(), "served sparse read");
        Ok(ArraySlice::sparse(values, coords))
    }
}

/// Copy the selected elements of a buffer into a new one
fn gather(buffer: &ValueBuffer, selected: &[usize]) -> Result<ValueBuffer> {
    let cell = buffer.dtype().size_bytes();
    let src = buffer.bytes();
    let mut bytes = Vec::with_capacity(selected.len() * cell);
    for &i in selected {
        bytes.extend_from_slice(&src[i * cell..(i + 1) * cell]);
    }
    ValueBuffer::from_bytes(buffer.dtype(), &bytes)
}
