//! Error types for batch generation over array storage

use std::io;
use thiserror::Error;

/// Result type for batch generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for batch generation operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during storage operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Array layout not supported by the requested generator
    #[error("unsupported schema: sparse arrays must have 2 dimensions, got {ndim}")]
    SchemaUnsupported {
        /// Number of dimensions in the offending schema
        ndim: usize,
    },

    /// Paired arrays disagree on the number of rows
    #[error("row count mismatch: x array has {x_rows} rows, y array has {y_rows} rows")]
    RowCountMismatch {
        /// Rows in the x (feature) array
        x_rows: usize,
        /// Rows in the y (label) array
        y_rows: usize,
    },

    /// Storage backend failed to serve a read
    #[error("storage read failed: {0}")]
    StorageRead(String),

    /// Tensor extraction requested before any buffer was read
    #[error("no buffer has been read into this generator")]
    BufferNotRead,

    /// Attribute name not present in the array schema
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Index out of bounds
    #[error("Index out of bounds")]
    IndexOutOfBounds,

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Data type mismatch
    #[error("Data type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The data type the caller asked for
        expected: String,
        /// The data type the buffer holds
        actual: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}
