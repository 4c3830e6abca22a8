//! Compressed sparse row buffering for sparse reads

use std::ops::Range;

use crate::error::{Error, Result};
use crate::tensor::SparseTensor;
use crate::values::ValueBuffer;

/// Non-empty cells of a buffered row window, compressed by row
///
/// Rows are buffer-local: global row coordinates are rebased against the
/// window start at construction. Values are permuted into row order, so a
/// row range maps onto one contiguous value slice.
#[derive(Debug, Clone)]
pub struct CsrBuffer {
    /// Offsets into `cols`/`values` per local row, `nrows + 1` entries
    row_ptrs: Vec<usize>,

    /// Column coordinate of each non-empty cell
    cols: Vec<u64>,

    /// Cell values in row order
    values: ValueBuffer,

    /// Extent of the column dimension
    ncols: usize,
}

impl CsrBuffer {
    /// Build a CSR buffer from global coordinate triplets
    ///
    /// `rows` and `cols` pair up with `values` element-wise. Row coordinates
    /// are global and get rebased by `row_offset`; the resulting local rows
    /// must fall inside `[0, nrows)`.
    pub fn from_coo(
        values: ValueBuffer,
        rows: &[u64],
        cols: &[u64],
        row_offset: u64,
        nrows: usize,
        ncols: usize,
    ) -> Result<Self> {
        if rows.len() != values.len() || cols.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "coordinate arrays ({} rows, {} cols) do not pair with {} values",
                rows.len(),
                cols.len(),
                values.len()
            )));
        }

        let mut row_ptrs = vec![0usize; nrows + 1];
        for (&row, &col) in rows.iter().zip(cols) {
            if row < row_offset || (row - row_offset) as usize >= nrows {
                return Err(Error::IndexOutOfBounds);
            }
            if col as usize >= ncols {
                return Err(Error::IndexOutOfBounds);
            }
            row_ptrs[(row - row_offset) as usize + 1] += 1;
        }
        for i in 0..nrows {
            row_ptrs[i + 1] += row_ptrs[i];
        }

        // Scatter cells into row order, preserving input order within a row
        let cell = values.dtype().size_bytes();
        let src = values.bytes();
        let mut sorted_bytes = vec![0u8; src.len()];
        let mut sorted_cols = vec![0u64; cols.len()];
        let mut next = row_ptrs.clone();
        for (i, (&row, &col)) in rows.iter().zip(cols).enumerate() {
            let local = (row - row_offset) as usize;
            let dst = next[local];
            next[local] += 1;
            sorted_cols[dst] = col;
            sorted_bytes[dst * cell..(dst + 1) * cell]
                .copy_from_slice(&src[i * cell..(i + 1) * cell]);
        }

        Ok(Self {
            row_ptrs,
            cols: sorted_cols,
            values: ValueBuffer::from_bytes(values.dtype(), &sorted_bytes)?,
            ncols,
        })
    }

    /// Get the number of buffered rows
    pub fn nrows(&self) -> usize {
        self.row_ptrs.len() - 1
    }

    /// Get the extent of the column dimension
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Get the number of non-empty cells
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Extract a local row range as a coordinate-format tensor
    ///
    /// Coordinates in the result are relative to `rows.start`; values are a
    /// zero-copy slice of the buffered values.
    pub fn slice_rows(&self, rows: Range<usize>) -> Result<SparseTensor> {
        if rows.start > rows.end || rows.end > self.nrows() {
            return Err(Error::IndexOutOfBounds);
        }

        let lo = self.row_ptrs[rows.start];
        let hi = self.row_ptrs[rows.end];
        let values = self.values.slice(lo, hi - lo)?;

        let mut coords = Vec::with_capacity((hi - lo) * 2);
        for local in rows.clone() {
            for k in self.row_ptrs[local]..self.row_ptrs[local + 1] {
                coords.push((local - rows.start) as u64);
                coords.push(self.cols[k]);
            }
        }

        SparseTensor::new(values, coords, vec![rows.end - rows.start, self.ncols])
    }
}
