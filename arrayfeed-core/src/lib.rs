//! Windowed batch generation over row-major array storage
//!
//! This crate turns two independently buffered array stores, one holding
//! features and one holding labels, into a single lazy sequence of
//! row-aligned tensor batches. It defines the storage-facing read traits,
//! the dual-stream windowing that keeps the two arrays in key alignment,
//! and the dense and sparse tensor generation that batches are assembled
//! from.

#![warn(missing_docs)]

pub mod array;
pub mod csr;
pub mod error;
pub mod generator;
pub mod schema;
pub mod sequencer;
pub mod tensor;
pub mod values;
pub mod window;

// Re-export key types for convenience
pub use array::{ArrayRead, ArraySlice, ReadQuery, RowRange, SparseCoords};
pub use csr::CsrBuffer;
pub use error::{Error, Result};
pub use generator::{
    tensor_generator_for, DenseTensorGenerator, SparseTensorGenerator, TensorGenerator, TensorIter,
};
pub use schema::{ArraySchema, Attribute, DataType, Dimension};
pub use sequencer::{Batch, BatchIter, BatchSequencer, SequencerOptions};
pub use tensor::{DenseTensor, SparseTensor, Tensor};
pub use values::{Scalar, ValueBuffer};
pub use window::{DualStreamWindower, StreamWindow, TensorWindow, WindowIter};
