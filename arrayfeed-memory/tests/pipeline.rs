//! End-to-end batch generation over in-memory arrays

use std::sync::atomic::{AtomicUsize, Ordering};

use arrayfeed_core::{
    ArrayRead, ArraySchema, ArraySlice, Attribute, BatchSequencer, DataType,
    DenseTensorGenerator, Dimension, Error, RowRange, SequencerOptions, SparseTensorGenerator,
    TensorGenerator, ValueBuffer,
};
use arrayfeed_memory::{DenseMemoryArray, SparseMemoryArray};
use test_case::test_case;

/// Dense `(rows, width)` float features, cell value = flat cell index
fn dense_features(rows: usize, width: usize) -> DenseMemoryArray {
    let schema = ArraySchema::dense(
        vec![
            Dimension::new("rows", rows),
            Dimension::new("cols", width),
        ],
        vec![Attribute::new("features", DataType::Float32)],
    )
    .unwrap();
    let values = (0..rows * width).map(|i| i as f32).collect();
    DenseMemoryArray::new(schema, vec![ValueBuffer::from_vec(values)]).unwrap()
}

/// Dense one-dimensional labels, label = row index
fn dense_labels(rows: usize) -> DenseMemoryArray {
    let schema = ArraySchema::dense(
        vec![Dimension::new("rows", rows)],
        vec![Attribute::new("label", DataType::Int32)],
    )
    .unwrap();
    let values = (0..rows as i32).collect();
    DenseMemoryArray::new(schema, vec![ValueBuffer::from_vec(values)]).unwrap()
}

/// Sparse `(rows, 16)` features with two cells per row:
/// `(r, r % 16) = r` and `(r, (r + 5) % 16) = r + 0.5`
fn sparse_features(rows: usize) -> SparseMemoryArray {
    let schema = ArraySchema::sparse(
        vec![Dimension::new("rows", rows), Dimension::new("cols", 16)],
        vec![Attribute::new("features", DataType::Float64)],
    )
    .unwrap();

    let mut row_coords = Vec::with_capacity(rows * 2);
    let mut col_coords = Vec::with_capacity(rows * 2);
    let mut values = Vec::with_capacity(rows * 2);
    for r in 0..rows {
        row_coords.push(r as u64);
        col_coords.push((r % 16) as u64);
        values.push(r as f64);
        row_coords.push(r as u64);
        col_coords.push(((r + 5) % 16) as u64);
        values.push(r as f64 + 0.5);
    }

    SparseMemoryArray::new(
        schema,
        vec![row_coords, col_coords],
        vec![ValueBuffer::from_vec(values)],
    )
    .unwrap()
}

fn sparse_3d() -> SparseMemoryArray {
    let schema = ArraySchema::sparse(
        vec![
            Dimension::new("rows", 8),
            Dimension::new("cols", 8),
            Dimension::new("depth", 8),
        ],
        vec![Attribute::new("values", DataType::Float64)],
    )
    .unwrap();
    SparseMemoryArray::new(
        schema,
        vec![vec![0], vec![1], vec![2]],
        vec![ValueBuffer::from_vec(vec![1.0f64])],
    )
    .unwrap()
}

#[test]
fn dense_roundtrip_reproduces_source_rows() {
    let x = dense_features(100, 4);
    let y = dense_labels(100);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 30,
            y_buffer_size: 10,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let batches: Vec<_> = sequencer
        .batches()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    // The smaller buffer divides the larger one, so every step is 10 wide
    assert_eq!(batches.len(), 10);

    let mut features = Vec::new();
    let mut labels = Vec::new();
    for batch in &batches {
        assert_eq!(batch.len(), 2);
        let x_tensor = batch[0].as_dense().unwrap();
        assert_eq!(x_tensor.shape(), &[10, 4]);
        features.extend_from_slice(x_tensor.values().typed::<f32>().unwrap());
        let y_tensor = batch[1].as_dense().unwrap();
        assert_eq!(y_tensor.shape(), &[10]);
        labels.extend_from_slice(y_tensor.values().typed::<i32>().unwrap());
    }

    let expected: Vec<f32> = (0..400).map(|i| i as f32).collect();
    assert_eq!(features, expected);
    assert_eq!(labels, (0..100).collect::<Vec<i32>>());
}

#[test_case(30, 20; "larger x buffer")]
#[test_case(20, 30; "larger y buffer")]
#[test_case(17, 3; "coprime sizes")]
#[test_case(100, 100; "buffers cover the range")]
fn streams_stay_row_aligned(x_buf: usize, y_buf: usize) {
    let x = dense_features(100, 4);
    let y = dense_labels(100);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: x_buf,
            y_buffer_size: y_buf,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let mut labels = Vec::new();
    let mut total_rows = 0;
    for batch in sequencer.batches().unwrap() {
        let batch = batch.unwrap();
        let x_tensor = batch[0].as_dense().unwrap();
        let y_tensor = batch[1].as_dense().unwrap();
        assert_eq!(x_tensor.shape()[0], y_tensor.shape()[0]);
        total_rows += x_tensor.shape()[0];
        labels.extend_from_slice(y_tensor.values().typed::<i32>().unwrap());
    }

    assert_eq!(total_rows, 100);
    assert_eq!(labels, (0..100).collect::<Vec<i32>>());
}

#[test]
fn restarted_pass_yields_identical_batches() {
    let x = sparse_features(200);
    let y = dense_labels(200);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 37,
            y_buffer_size: 25,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let first: Vec<_> = sequencer
        .batches()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let second: Vec<_> = sequencer
        .batches()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn sparse_coordinates_are_batch_local() {
    let x = sparse_features(200);
    let y = dense_labels(200);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 37,
            y_buffer_size: 25,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let mut base_row = 0usize;
    let mut cells = Vec::new();
    for batch in sequencer.batches().unwrap() {
        let batch = batch.unwrap();
        let tensor = batch[0].as_sparse().unwrap();
        let width = tensor.dense_shape()[0];
        assert_eq!(tensor.dense_shape()[1], 16);

        let values = tensor.values().typed::<f64>().unwrap();
        for (pair, &value) in tensor.coords().chunks_exact(2).zip(values) {
            // Never expressed in global or whole-buffer space
            assert!((pair[0] as usize) < width);
            cells.push((base_row + pair[0] as usize, pair[1], value));
        }
        base_row += width;
    }
    assert_eq!(base_row, 200);

    let mut expected = Vec::new();
    for r in 0..200usize {
        expected.push((r, (r % 16) as u64, r as f64));
        expected.push((r, ((r + 5) % 16) as u64, r as f64 + 0.5));
    }
    cells.sort_by(|a, b| a.partial_cmp(b).unwrap());
    expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(cells, expected);
}

#[test]
fn sparse_label_stream() {
    let x = dense_features(64, 4);
    let y = sparse_features(64);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 16,
            y_buffer_size: 24,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let mut nnz = 0;
    for batch in sequencer.batches().unwrap() {
        let batch = batch.unwrap();
        let y_tensor = batch[1].as_sparse().unwrap();
        assert_eq!(y_tensor.dense_shape()[0], batch[0].shape()[0]);
        nnz += y_tensor.nnz();
    }
    assert_eq!(nnz, 128);
}

struct CountingArray<'a> {
    inner: &'a DenseMemoryArray,
    reads: &'a AtomicUsize,
}

impl ArrayRead for CountingArray<'_> {
    fn schema(&self) -> &ArraySchema {
        self.inner.schema()
    }

    fn read(&self, rows: RowRange, attrs: &[String]) -> arrayfeed_core::Result<ArraySlice> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(rows, attrs)
    }
}

#[test]
fn row_count_mismatch_detected_before_any_read() {
    let x_inner = dense_features(108, 4);
    let y_inner = dense_labels(107);
    let x_reads = AtomicUsize::new(0);
    let y_reads = AtomicUsize::new(0);
    let x = CountingArray {
        inner: &x_inner,
        reads: &x_reads,
    };
    let y = CountingArray {
        inner: &y_inner,
        reads: &y_reads,
    };

    let err = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 16,
            y_buffer_size: 16,
            ..SequencerOptions::default()
        },
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        Error::RowCountMismatch {
            x_rows: 108,
            y_rows: 107
        }
    ));
    // Both observed counts are reported to the caller
    let message = err.to_string();
    assert!(message.contains("108") && message.contains("107"));

    assert_eq!(x_reads.load(Ordering::SeqCst), 0);
    assert_eq!(y_reads.load(Ordering::SeqCst), 0);
}

#[test]
fn sparse_generator_rejects_non_2d_schema() {
    let array = sparse_3d();
    let err = SparseTensorGenerator::new(&array, &[]).err().unwrap();
    assert!(matches!(err, Error::SchemaUnsupported { ndim: 3 }));
}

#[test]
fn sequencer_surfaces_schema_guard_at_construction() {
    let x = sparse_3d();
    let y = dense_labels(8);
    let err = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 4,
            y_buffer_size: 4,
            ..SequencerOptions::default()
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::SchemaUnsupported { ndim: 3 }));
}

struct FailingArray {
    inner: DenseMemoryArray,
    fail_after: usize,
    reads: AtomicUsize,
}

impl ArrayRead for FailingArray {
    fn schema(&self) -> &ArraySchema {
        self.inner.schema()
    }

    fn read(&self, rows: RowRange, attrs: &[String]) -> arrayfeed_core::Result<ArraySlice> {
        let served = self.reads.fetch_add(1, Ordering::SeqCst);
        if served >= self.fail_after {
            return Err(Error::StorageRead("simulated device failure".to_string()));
        }
        self.inner.read(rows, attrs)
    }
}

#[test]
fn storage_failure_propagates_and_ends_the_pass() {
    let x = FailingArray {
        inner: dense_features(100, 4),
        fail_after: 2,
        reads: AtomicUsize::new(0),
    };
    let y = dense_labels(100);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 20,
            y_buffer_size: 20,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    // Equal buffers fetch every step, so the third step hits the failure
    let mut iter = sequencer.batches().unwrap();
    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().unwrap().is_ok());
    assert!(matches!(iter.next().unwrap(), Err(Error::StorageRead(_))));
    assert!(iter.next().is_none());
}

#[test]
fn extraction_before_any_fetch_is_rejected() {
    let dense = dense_features(10, 4);
    let generator = DenseTensorGenerator::new(&dense, &[]).unwrap();
    assert!(matches!(
        generator.iter_tensors(RowRange::new(0, 5)),
        Err(Error::BufferNotRead)
    ));

    let sparse = sparse_features(10);
    let generator = SparseTensorGenerator::new(&sparse, &[]).unwrap();
    assert!(matches!(
        generator.iter_tensors(RowRange::new(0, 5)),
        Err(Error::BufferNotRead)
    ));
}

fn dense_multi(rows: usize) -> DenseMemoryArray {
    let schema = ArraySchema::dense(
        vec![Dimension::new("rows", rows)],
        vec![
            Attribute::new("red", DataType::UInt8),
            Attribute::new("green", DataType::Float32),
            Attribute::new("blue", DataType::Int64),
        ],
    )
    .unwrap();
    DenseMemoryArray::new(
        schema,
        vec![
            ValueBuffer::from_vec((0..rows).map(|i| i as u8).collect()),
            ValueBuffer::from_vec((0..rows).map(|i| i as f32 / 2.0).collect()),
            ValueBuffer::from_vec((0..rows as i64).map(|i| -i).collect()),
        ],
    )
    .unwrap()
}

#[test]
fn attribute_subset_selection_and_order() {
    let x = dense_multi(40);
    let y = dense_labels(40);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 8,
            y_buffer_size: 8,
            x_attrs: vec!["blue".to_string(), "red".to_string()],
            ..SequencerOptions::default()
        },
    )
    .unwrap();
    assert_eq!(sequencer.tensors_per_batch(), 3);

    let batches: Vec<_> = sequencer
        .batches()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let first = &batches[0];
    assert_eq!(first.len(), 3);
    // Requested feature order, then the label attributes
    assert_eq!(first[0].dtype(), DataType::Int64);
    assert_eq!(
        first[0].as_dense().unwrap().values().typed::<i64>().unwrap(),
        &[0, -1, -2, -3, -4, -5, -6, -7]
    );
    assert_eq!(first[1].dtype(), DataType::UInt8);
    assert_eq!(first[2].dtype(), DataType::Int32);
}

#[test]
fn unknown_attribute_rejected_at_construction() {
    let x = dense_multi(40);
    let y = dense_labels(40);
    let err = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 8,
            y_buffer_size: 8,
            x_attrs: vec!["magenta".to_string()],
            ..SequencerOptions::default()
        },
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::UnknownAttribute(name) if name == "magenta"));
}

#[test]
fn offsets_restrict_the_iterated_range() {
    let x = dense_features(100, 4);
    let y = dense_labels(100);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 13,
            y_buffer_size: 7,
            start_offset: 25,
            stop_offset: 75,
            ..SequencerOptions::default()
        },
    )
    .unwrap();
    assert_eq!(sequencer.range(), RowRange::new(25, 75));

    let mut labels = Vec::new();
    for batch in sequencer.batches().unwrap() {
        let batch = batch.unwrap();
        labels.extend_from_slice(batch[1].as_dense().unwrap().values().typed::<i32>().unwrap());
    }
    assert_eq!(labels, (25..75).collect::<Vec<i32>>());
}

#[test]
fn invalid_offsets_and_buffers_rejected() {
    let x = dense_features(100, 4);
    let y = dense_labels(100);

    let stop_past_end = SequencerOptions {
        x_buffer_size: 10,
        y_buffer_size: 10,
        stop_offset: 101,
        ..SequencerOptions::default()
    };
    assert!(BatchSequencer::new(&x, &y, stop_past_end).is_err());

    let empty_range = SequencerOptions {
        x_buffer_size: 10,
        y_buffer_size: 10,
        start_offset: 50,
        stop_offset: 50,
        ..SequencerOptions::default()
    };
    assert!(BatchSequencer::new(&x, &y, empty_range).is_err());

    let zero_buffer = SequencerOptions {
        x_buffer_size: 0,
        y_buffer_size: 10,
        ..SequencerOptions::default()
    };
    assert!(BatchSequencer::new(&x, &y, zero_buffer).is_err());
}

#[test]
fn dense_rows_with_higher_rank() {
    let schema = ArraySchema::dense(
        vec![
            Dimension::new("rows", 12),
            Dimension::new("h", 2),
            Dimension::new("w", 3),
        ],
        vec![Attribute::new("pixels", DataType::UInt16)],
    )
    .unwrap();
    let x = DenseMemoryArray::new(
        schema,
        vec![ValueBuffer::from_vec((0..72u16).collect())],
    )
    .unwrap();
    let y = dense_labels(12);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 5,
            y_buffer_size: 4,
            ..SequencerOptions::default()
        },
    )
    .unwrap();

    let batches: Vec<_> = sequencer
        .batches()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let widths: Vec<usize> = batches.iter().map(|b| b[0].shape()[0]).collect();
    assert_eq!(widths, vec![4, 1, 3, 2, 2]);

    let mut cells = Vec::new();
    for batch in &batches {
        let tensor = batch[0].as_dense().unwrap();
        assert_eq!(&tensor.shape()[1..], &[2, 3]);
        cells.extend_from_slice(tensor.values().typed::<u16>().unwrap());
    }
    assert_eq!(cells, (0..72u16).collect::<Vec<_>>());
}

#[test]
fn traced_pipeline_smoke() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let x = dense_features(20, 4);
    let y = dense_labels(20);
    let sequencer = BatchSequencer::new(
        &x,
        &y,
        SequencerOptions {
            x_buffer_size: 6,
            y_buffer_size: 9,
            ..SequencerOptions::default()
        },
    )
    .unwrap();
    assert_eq!(sequencer.batches().unwrap().count(), 5);
}
