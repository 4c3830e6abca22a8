//! Dual-stream windowing over a shared row range
//!
//! Two arrays buffered at different sizes must still hand out batches whose
//! rows line up. The windower walks one global cursor pair across the row
//! range; every step it tops up whichever stream ran out of buffered rows
//! and then extracts the widest slice both buffers can serve. Widths shrink
//! at buffer boundaries instead of spanning them, so an extraction never
//! mixes rows from two fetches.

use crate::array::RowRange;
use crate::error::{Error, Result};

/// One stream's instructions for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamWindow {
    /// Global rows to fetch into the buffer this step, absent when the
    /// previous fetch still has unconsumed rows
    pub read_slice: Option<RowRange>,

    /// Buffer-local rows to turn into tensors this step
    pub extract_slice: RowRange,
}

/// Paired per-stream instructions for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorWindow {
    /// Instructions for the feature stream
    pub x: StreamWindow,

    /// Instructions for the label stream
    pub y: StreamWindow,
}

/// Produces aligned window sequences for two independently buffered streams
///
/// Each call to [`windows`](Self::windows) starts a fresh pass over the same
/// row range, so repeated traversals see identical sequences.
#[derive(Debug, Clone)]
pub struct DualStreamWindower {
    x_buffer_size: usize,
    y_buffer_size: usize,
    range: RowRange,
}

impl DualStreamWindower {
    /// Create a windower over `range` with per-stream buffer capacities
    pub fn new(x_buffer_size: usize, y_buffer_size: usize, range: RowRange) -> Result<Self> {
        if x_buffer_size == 0 || y_buffer_size == 0 {
            return Err(Error::InvalidArgument(
                "buffer sizes must be positive".to_string(),
            ));
        }
        if range.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "row range {range} is empty"
            )));
        }

        Ok(Self {
            x_buffer_size,
            y_buffer_size,
            range,
        })
    }

    /// Get the row range this windower covers
    pub fn range(&self) -> RowRange {
        self.range
    }

    /// Start a fresh pass over the row range
    pub fn windows(&self) -> WindowIter {
        WindowIter {
            x: Cursor::new(self.x_buffer_size, self.range.start),
            y: Cursor::new(self.y_buffer_size, self.range.start),
            stop: self.range.stop,
        }
    }
}

/// One stream's position: the materialized buffer and the next unconsumed row
#[derive(Debug, Clone)]
struct Cursor {
    buffer_size: usize,
    buf_start: usize,
    buf_end: usize,
    next: usize,
}

impl Cursor {
    fn new(buffer_size: usize, start: usize) -> Self {
        // buf_end == next marks the buffer as exhausted, forcing a fetch on
        // the first step
        Self {
            buffer_size,
            buf_start: start,
            buf_end: start,
            next: start,
        }
    }

    /// Rows left in the current buffer
    fn remaining(&self) -> usize {
        self.buf_end - self.next
    }

    /// Fetch the next buffer if this one is exhausted, clipped at `stop`
    fn refill(&mut self, stop: usize) -> Option<RowRange> {
        if self.next < self.buf_end {
            return None;
        }
        self.buf_start = self.next;
        self.buf_end = (self.next + self.buffer_size).min(stop);
        Some(RowRange::new(self.buf_start, self.buf_end))
    }

    /// Consume `width` rows, returning the buffer-local slice they occupy
    fn extract(&mut self, width: usize) -> RowRange {
        let local = self.next - self.buf_start;
        self.next += width;
        RowRange::new(local, local + width)
    }
}

/// Iterator over one pass of aligned windows
#[derive(Debug, Clone)]
pub struct WindowIter {
    x: Cursor,
    y: Cursor,
    stop: usize,
}

impl Iterator for WindowIter {
    type Item = TensorWindow;

    fn next(&mut self) -> Option<TensorWindow> {
        debug_assert_eq!(self.x.next, self.y.next);
        if self.x.next >= self.stop {
            return None;
        }

        let x_read = self.x.refill(self.stop);
        let y_read = self.y.refill(self.stop);

        // Both buffers now hold at least one row; the shared width is
        // whatever the fuller buffer can match without crossing the other's
        // boundary
        let width = self.x.remaining().min(self.y.remaining());

        Some(TensorWindow {
            x: StreamWindow {
                read_slice: x_read,
                extract_slice: self.x.extract(width),
            },
            y: StreamWindow {
                read_slice: y_read,
                extract_slice: self.y.extract(width),
            },
        })
    }
}
