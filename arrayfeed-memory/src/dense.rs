//! Dense in-memory arrays

use arrayfeed_core::{
    ArrayRead, ArraySchema, ArraySlice, Error, Result, RowRange, ValueBuffer,
};

/// A dense array held fully in memory, one row-major buffer per attribute
///
/// Reads are zero-copy: a row range maps onto one contiguous element range
/// of each attribute buffer.
pub struct DenseMemoryArray {
    schema: ArraySchema,
    columns: Vec<ValueBuffer>,
}

impl DenseMemoryArray {
    /// Create an array over owned attribute buffers
    ///
    /// Buffers pair with the schema's attributes in order; each must hold
    /// `row_count * cells_per_row` values of the attribute's dtype.
    pub fn new(schema: ArraySchema, columns: Vec<ValueBuffer>) -> Result<Self> {
        if schema.is_sparse() {
            return Err(Error::InvalidArgument(
                "dense array requires a dense schema".to_string(),
            ));
        }
        if columns.len() != schema.attrs().len() {
            return Err(Error::InvalidArgument(format!(
                "{} attribute buffers for {} schema attributes",
                columns.len(),
                schema.attrs().len()
            )));
        }

        let cells = schema.row_count() * schema.cells_per_row();
        for (attr, column) in schema.attrs().iter().zip(&columns) {
            if column.dtype() != attr.dtype {
                return Err(Error::InvalidArgument(format!(
                    "attribute {}: buffer dtype {} does not match schema dtype {}",
                    attr.name,
                    column.dtype(),
                    attr.dtype
                )));
            }
            if column.len() != cells {
                return Err(Error::InvalidArgument(format!(
                    "attribute {}: buffer holds {} cells, schema implies {}",
                    attr.name,
                    column.len(),
                    cells
                )));
            }
        }

        Ok(Self { schema, columns })
    }
}

impl ArrayRead for DenseMemoryArray {
    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn read(&self, rows: RowRange, attrs: &[String]) -> Result<ArraySlice> {
        if rows.start > rows.stop || rows.stop > self.schema.row_count() {
            return Err(Error::IndexOutOfBounds);
        }

        let cells = self.schema.cells_per_row();
        let values = attrs
            .iter()
            .map(|name| {
                let index = self.schema.attr_index(name)?;
                self.columns[index].slice(rows.start * cells, rows.len() * cells)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(rows = %rows, attrs = attrs.len(), "served dense read");
        Ok(ArraySlice::dense(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrayfeed_core::{Attribute, DataType, Dimension};

    fn schema_2d(rows: usize, cols: usize) -> ArraySchema {
        ArraySchema::dense(
            vec![Dimension::new("rows", rows), Dimension::new("cols", cols)],
            vec![
                Attribute::new("values", DataType::Float32),
                Attribute::new("counts", DataType::Int64),
            ],
        )
        .unwrap()
    }

    fn sample() -> DenseMemoryArray {
        let cells = 6 * 2;
        DenseMemoryArray::new(
            schema_2d(6, 2),
            vec![
                ValueBuffer::from_vec((0..cells).map(|i| i as f32).collect()),
                ValueBuffer::from_vec((0..cells as i64).map(|i| i * 10).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn read_slices_rows_zero_copy() {
        let array = sample();
        let slice = array
            .read(RowRange::new(2, 4), &["values".to_string()])
            .unwrap();
        assert_eq!(slice.values.len(), 1);
        assert!(slice.coords.is_none());
        assert_eq!(
            slice.values[0].typed::<f32>().unwrap(),
            &[4.0, 5.0, 6.0, 7.0]
        );
    }

    #[test]
    fn read_respects_attr_request_order() {
        let array = sample();
        let slice = array
            .read(
                RowRange::new(0, 1),
                &["counts".to_string(), "values".to_string()],
            )
            .unwrap();
        assert_eq!(slice.values[0].typed::<i64>().unwrap(), &[0, 10]);
        assert_eq!(slice.values[1].typed::<f32>().unwrap(), &[0.0, 1.0]);
    }

    #[test]
    fn read_validates_bounds_and_attrs() {
        let array = sample();
        assert!(matches!(
            array.read(RowRange::new(4, 7), &["values".to_string()]),
            Err(Error::IndexOutOfBounds)
        ));
        assert!(matches!(
            array.read(RowRange::new(0, 1), &["missing".to_string()]),
            Err(Error::UnknownAttribute(_))
        ));
    }

    #[test]
    fn new_rejects_mismatched_buffers() {
        // Too few buffers
        assert!(DenseMemoryArray::new(
            schema_2d(6, 2),
            vec![ValueBuffer::from_vec(vec![0.0f32; 12])],
        )
        .is_err());

        // Wrong dtype for the first attribute
        assert!(DenseMemoryArray::new(
            schema_2d(6, 2),
            vec![
                ValueBuffer::from_vec(vec![0.0f64; 12]),
                ValueBuffer::from_vec(vec![0i64; 12]),
            ],
        )
        .is_err());

        // Wrong cell count
        assert!(DenseMemoryArray::new(
            schema_2d(6, 2),
            vec![
                ValueBuffer::from_vec(vec![0.0f32; 10]),
                ValueBuffer::from_vec(vec![0i64; 12]),
            ],
        )
        .is_err());
    }

    #[test]
    fn new_rejects_sparse_schema() {
        let schema = ArraySchema::sparse(
            vec![Dimension::new("rows", 4), Dimension::new("cols", 4)],
            vec![Attribute::new("values", DataType::Float32)],
        )
        .unwrap();
        assert!(DenseMemoryArray::new(schema, vec![ValueBuffer::from_vec(vec![0.0f32; 16])]).is_err());
    }
}
