//! In-memory array storage backends
//!
//! Owned implementations of [`arrayfeed_core::ArrayRead`] for dense grids
//! and sparse coordinate sets. They serve as reference backends for the
//! batch-generation pipeline and as fixtures for exercising it end to end.

#![warn(missing_docs)]

pub mod dense;
pub mod sparse;

pub use dense::DenseMemoryArray;
pub use sparse::SparseMemoryArray;
