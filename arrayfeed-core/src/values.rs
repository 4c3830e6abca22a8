//! Type-erased value storage shared between read results and tensors

use std::sync::Arc;

use bytemuck::Pod;

use crate::error::{Error, Result};
use crate::schema::DataType;

/// Rust scalar types that can back a [`ValueBuffer`]
pub trait Scalar: Pod {
    /// The dtype tag corresponding to this Rust type
    const DATA_TYPE: DataType;
}

impl Scalar for i8 {
    const DATA_TYPE: DataType = DataType::Int8;
}

impl Scalar for i16 {
    const DATA_TYPE: DataType = DataType::Int16;
}

impl Scalar for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
}

impl Scalar for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
}

impl Scalar for u8 {
    const DATA_TYPE: DataType = DataType::UInt8;
}

impl Scalar for u16 {
    const DATA_TYPE: DataType = DataType::UInt16;
}

impl Scalar for u32 {
    const DATA_TYPE: DataType = DataType::UInt32;
}

impl Scalar for u64 {
    const DATA_TYPE: DataType = DataType::UInt64;
}

impl Scalar for f32 {
    const DATA_TYPE: DataType = DataType::Float32;
}

impl Scalar for f64 {
    const DATA_TYPE: DataType = DataType::Float64;
}

/// An immutable, dtype-tagged buffer of scalar values
///
/// The backing store is a refcounted slice of 64-bit words, so every
/// fixed-width dtype view starts on a properly aligned boundary and slicing
/// never copies. Views are produced at element granularity; the element
/// width comes from the dtype tag.
#[derive(Debug, Clone)]
pub struct ValueBuffer {
    /// Data type of the stored values
    dtype: DataType,

    /// Word-aligned backing store shared between slices
    words: Arc<[u64]>,

    /// Element offset of this view into the backing store
    offset: usize,

    /// Number of elements in this view
    len: usize,
}

impl ValueBuffer {
    /// Create a buffer from a vector of scalar values
    pub fn from_vec<T: Scalar>(values: Vec<T>) -> Self {
        let byte_len = values.len() * std::mem::size_of::<T>();
        let mut words = vec![0u64; (byte_len + 7) / 8];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..byte_len]
            .copy_from_slice(bytemuck::cast_slice(&values));

        Self {
            dtype: T::DATA_TYPE,
            words: words.into(),
            offset: 0,
            len: values.len(),
        }
    }

    /// Create a buffer by copying raw little-endian cell bytes
    pub fn from_bytes(dtype: DataType, bytes: &[u8]) -> Result<Self> {
        let cell = dtype.size_bytes();
        if bytes.len() % cell != 0 {
            return Err(Error::InvalidArgument(format!(
                "byte length {} is not a multiple of {} ({} cells)",
                bytes.len(),
                cell,
                dtype
            )));
        }

        let mut words = vec![0u64; (bytes.len() + 7) / 8];
        bytemuck::cast_slice_mut::<u64, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            dtype,
            words: words.into(),
            offset: 0,
            len: bytes.len() / cell,
        })
    }

    /// Get the data type of the stored values
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Get the number of elements in this view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if this view is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the size of this view in bytes
    pub fn size_bytes(&self) -> usize {
        self.len * self.dtype.size_bytes()
    }

    /// Get the raw bytes of this view
    pub fn bytes(&self) -> &[u8] {
        let cell = self.dtype.size_bytes();
        let all = bytemuck::cast_slice::<u64, u8>(&self.words);
        &all[self.offset * cell..(self.offset + self.len) * cell]
    }

    /// Get a typed view of the stored values
    ///
    /// Fails with [`Error::TypeMismatch`] when `T` does not match the dtype
    /// tag this buffer was created with.
    pub fn typed<T: Scalar>(&self) -> Result<&[T]> {
        if T::DATA_TYPE != self.dtype {
            return Err(Error::TypeMismatch {
                expected: T::DATA_TYPE.to_string(),
                actual: self.dtype.to_string(),
            });
        }

        bytemuck::try_cast_slice(self.bytes())
            .map_err(|e| Error::InvalidArgument(format!("cast failed: {e}")))
    }

    /// Create a zero-copy view of a range of elements
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        if offset + len > self.len {
            return Err(Error::IndexOutOfBounds);
        }

        Ok(Self {
            dtype: self.dtype,
            words: Arc::clone(&self.words),
            offset: self.offset + offset,
            len,
        })
    }
}

impl PartialEq for ValueBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype && self.bytes() == other.bytes()
    }
}
