//! Read access to row-major array storage

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::ArraySchema;
use crate::values::ValueBuffer;

/// A half-open range of global row indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRange {
    /// First row of the range
    pub start: usize,

    /// One past the last row of the range
    pub stop: usize,
}

impl RowRange {
    /// Create a new row range
    pub fn new(start: usize, stop: usize) -> Self {
        Self { start, stop }
    }

    /// Get the number of rows in this range
    pub fn len(&self) -> usize {
        self.stop.saturating_sub(self.start)
    }

    /// Check if this range contains no rows
    pub fn is_empty(&self) -> bool {
        self.stop <= self.start
    }

    /// Check if this range contains a row
    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.stop
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// Global coordinates of the non-empty cells in a sparse read
#[derive(Debug, Clone, PartialEq)]
pub struct SparseCoords {
    /// Row coordinate of each cell
    pub rows: Vec<u64>,

    /// Column coordinate of each cell
    pub cols: Vec<u64>,
}

/// The values served by one read against an array
///
/// Dense reads carry one buffer per requested attribute in request order,
/// `rows * cells_per_row` values each. Sparse reads additionally carry the
/// global coordinates shared by all attribute buffers.
#[derive(Debug, Clone)]
pub struct ArraySlice {
    /// One value buffer per requested attribute
    pub values: Vec<ValueBuffer>,

    /// Cell coordinates, present for sparse reads only
    pub coords: Option<SparseCoords>,
}

impl ArraySlice {
    /// Create a dense read result
    pub fn dense(values: Vec<ValueBuffer>) -> Self {
        Self {
            values,
            coords: None,
        }
    }

    /// Create a sparse read result
    pub fn sparse(values: Vec<ValueBuffer>, coords: SparseCoords) -> Self {
        Self {
            values,
            coords: Some(coords),
        }
    }
}

/// Read access to a row-major array
pub trait ArrayRead: Send + Sync {
    /// Get the schema of this array
    fn schema(&self) -> &ArraySchema;

    /// Get the number of rows along the row dimension
    fn row_count(&self) -> usize {
        self.schema().row_count()
    }

    /// Read the requested attributes for a range of rows
    ///
    /// Callers pass ranges inside `[0, row_count)` and attribute names
    /// validated against the schema. Backends fail with
    /// [`Error::StorageRead`] when they cannot serve the read.
    fn read(&self, rows: RowRange, attrs: &[String]) -> Result<ArraySlice>;
}

/// An array bound to a validated attribute subset
///
/// Attribute names are resolved against the schema once, at construction;
/// every read issued through the query requests exactly that subset.
pub struct ReadQuery<'a> {
    array: &'a dyn ArrayRead,
    attrs: Vec<String>,
}

impl<'a> ReadQuery<'a> {
    /// Bind an array to an attribute subset
    ///
    /// An empty subset selects every attribute in schema order.
    pub fn new(array: &'a dyn ArrayRead, attrs: &[String]) -> Result<Self> {
        let attrs = if attrs.is_empty() {
            array.schema().attr_names()
        } else {
            for name in attrs {
                array.schema().attr_index(name)?;
            }
            attrs.to_vec()
        };

        Ok(Self { array, attrs })
    }

    /// Get the schema of the underlying array
    pub fn schema(&self) -> &ArraySchema {
        self.array.schema()
    }

    /// Get the bound attribute names
    pub fn attrs(&self) -> &[String] {
        &self.attrs
    }

    /// Read the bound attributes for a range of rows
    pub fn read(&self, rows: RowRange) -> Result<ArraySlice> {
        self.array.read(rows, &self.attrs)
    }
}
