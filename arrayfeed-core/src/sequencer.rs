//! Top-level batch sequencing over a feature/label array pair

use crate::array::{ArrayRead, RowRange};
use crate::error::{Error, Result};
use crate::generator::{tensor_generator_for, TensorGenerator};
use crate::tensor::Tensor;
use crate::window::{DualStreamWindower, TensorWindow, WindowIter};

/// One yielded step: feature tensors in attribute order, then label tensors
pub type Batch = Vec<Tensor>;

/// Configuration for a [`BatchSequencer`]
///
/// Buffer sizes must be set explicitly; the remaining fields default to
/// reading every attribute over the full row range.
#[derive(Debug, Clone, Default)]
pub struct SequencerOptions {
    /// Rows fetched per read from the feature array
    pub x_buffer_size: usize,

    /// Rows fetched per read from the label array
    pub y_buffer_size: usize,

    /// Feature attributes to read; empty selects all in schema order
    pub x_attrs: Vec<String>,

    /// Label attributes to read; empty selects all in schema order
    pub y_attrs: Vec<String>,

    /// First row to iterate
    pub start_offset: usize,

    /// One past the last row to iterate; zero selects the full row count
    pub stop_offset: usize,
}

/// Drives windowed tensor generation over two row-aligned arrays
///
/// Construction validates everything the iteration contract depends on
/// (row-count agreement, offsets, buffer sizes, schemas and attribute
/// subsets) before any data is read. Each [`batches`](Self::batches) call
/// starts an independent pass that re-derives its windower and generators,
/// so repeated full traversals yield identical sequences.
pub struct BatchSequencer<'a> {
    x_array: &'a dyn ArrayRead,
    y_array: &'a dyn ArrayRead,
    x_attrs: Vec<String>,
    y_attrs: Vec<String>,
    windower: DualStreamWindower,
}

impl<'a> BatchSequencer<'a> {
    /// Create a sequencer over a feature array and a label array
    pub fn new(
        x_array: &'a dyn ArrayRead,
        y_array: &'a dyn ArrayRead,
        options: SequencerOptions,
    ) -> Result<Self> {
        let x_rows = x_array.row_count();
        let y_rows = y_array.row_count();
        if x_rows != y_rows {
            return Err(Error::RowCountMismatch { x_rows, y_rows });
        }

        let stop = if options.stop_offset == 0 {
            x_rows
        } else {
            options.stop_offset
        };
        if stop > x_rows {
            return Err(Error::InvalidArgument(format!(
                "stop offset {stop} exceeds row count {x_rows}"
            )));
        }

        let range = RowRange::new(options.start_offset, stop);
        let windower =
            DualStreamWindower::new(options.x_buffer_size, options.y_buffer_size, range)?;

        let x_attrs = resolve_attrs(x_array, options.x_attrs)?;
        let y_attrs = resolve_attrs(y_array, options.y_attrs)?;

        // Construct and drop one generator per array so schema problems
        // surface here rather than on the first pass
        tensor_generator_for(x_array, &x_attrs)?;
        tensor_generator_for(y_array, &y_attrs)?;

        tracing::debug!(
            rows = x_rows,
            range = %range,
            x_buffer_size = options.x_buffer_size,
            y_buffer_size = options.y_buffer_size,
            "constructed batch sequencer"
        );

        Ok(Self {
            x_array,
            y_array,
            x_attrs,
            y_attrs,
            windower,
        })
    }

    /// Get the row range this sequencer iterates
    pub fn range(&self) -> RowRange {
        self.windower.range()
    }

    /// Get the number of tensors in each yielded batch
    pub fn tensors_per_batch(&self) -> usize {
        self.x_attrs.len() + self.y_attrs.len()
    }

    /// Start a fresh pass over the row range
    pub fn batches(&self) -> Result<BatchIter<'a>> {
        Ok(BatchIter {
            windows: self.windower.windows(),
            x_gen: tensor_generator_for(self.x_array, &self.x_attrs)?,
            y_gen: tensor_generator_for(self.y_array, &self.y_attrs)?,
            tensors_per_batch: self.tensors_per_batch(),
            failed: false,
        })
    }
}

fn resolve_attrs(array: &dyn ArrayRead, attrs: Vec<String>) -> Result<Vec<String>> {
    if attrs.is_empty() {
        return Ok(array.schema().attr_names());
    }
    for name in &attrs {
        array.schema().attr_index(name)?;
    }
    Ok(attrs)
}

/// One pass of batches; fuses after the first error
pub struct BatchIter<'a> {
    windows: WindowIter,
    x_gen: Box<dyn TensorGenerator + 'a>,
    y_gen: Box<dyn TensorGenerator + 'a>,
    tensors_per_batch: usize,
    failed: bool,
}

impl BatchIter<'_> {
    fn step(&mut self, window: TensorWindow) -> Result<Batch> {
        if let Some(read) = window.x.read_slice {
            self.x_gen.read_buffer(read)?;
        }
        if let Some(read) = window.y.read_slice {
            self.y_gen.read_buffer(read)?;
        }

        let mut batch = Vec::with_capacity(self.tensors_per_batch);
        for tensor in self.x_gen.iter_tensors(window.x.extract_slice)? {
            batch.push(tensor?);
        }
        for tensor in self.y_gen.iter_tensors(window.y.extract_slice)? {
            batch.push(tensor?);
        }
        Ok(batch)
    }
}

impl Iterator for BatchIter<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let window = self.windows.next()?;
        match self.step(window) {
            Ok(batch) => Some(Ok(batch)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
