//! Benchmarks for the batch generation pipeline

use std::time::{Duration, Instant};

use arrayfeed_core::{
    ArraySchema, Attribute, BatchSequencer, DataType, Dimension, DualStreamWindower, Error,
    Result, RowRange, SequencerOptions, ValueBuffer,
};
use arrayfeed_memory::{DenseMemoryArray, SparseMemoryArray};

/// Benchmark configuration
pub struct BenchConfig {
    /// Number of timed iterations
    pub iterations: usize,

    /// Warmup iterations run before timing starts
    pub warmup_iterations: usize,

    /// Rows in each generated array
    pub rows: usize,

    /// Cells per row in the dense feature array
    pub row_width: usize,

    /// Feature stream buffer size, in rows
    pub x_buffer_size: usize,

    /// Label stream buffer size, in rows
    pub y_buffer_size: usize,

    /// Populated cells per row in the sparse feature array
    pub nnz_per_row: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            warmup_iterations: 3,
            rows: 100_000,
            row_width: 32,
            x_buffer_size: 4096,
            y_buffer_size: 1024,
            nnz_per_row: 4,
        }
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchResult {
    /// Name of the benchmark
    pub name: String,

    /// Total time taken
    pub total_time: Duration,

    /// Average time per iteration
    pub avg_time: Duration,

    /// Min time per iteration
    pub min_time: Duration,

    /// Max time per iteration
    pub max_time: Duration,

    /// Throughput (rows/second)
    pub throughput: f64,
}

/// Run a benchmark
pub fn run_benchmark<F>(name: &str, config: &BenchConfig, func: F) -> BenchResult
where
    F: Fn() -> Result<()>,
{
    // Warmup
    for _ in 0..config.warmup_iterations {
        func().unwrap();
    }

    // Actual benchmark
    let mut times = Vec::with_capacity(config.iterations);
    let start_total = Instant::now();

    for _ in 0..config.iterations {
        let start = Instant::now();
        func().unwrap();
        times.push(start.elapsed());
    }

    let total_time = start_total.elapsed();

    // Calculate statistics
    let avg_time = times.iter().sum::<Duration>() / times.len() as u32;
    let min_time = *times.iter().min().unwrap();
    let max_time = *times.iter().max().unwrap();

    let total_rows = config.iterations * config.rows;
    let throughput = total_rows as f64 / total_time.as_secs_f64();

    tracing::debug!(
        name,
        iterations = config.iterations,
        avg = ?avg_time,
        "benchmark finished"
    );

    BenchResult {
        name: name.to_string(),
        total_time,
        avg_time,
        min_time,
        max_time,
        throughput,
    }
}

/// Dense feature array of shape `(rows, row_width)` filled with a ramp
pub fn dense_features(rows: usize, row_width: usize) -> DenseMemoryArray {
    let schema = ArraySchema::dense(
        vec![
            Dimension::new("rows", rows),
            Dimension::new("cols", row_width),
        ],
        vec![Attribute::new("features", DataType::Float32)],
    )
    .unwrap();
    let values: Vec<f32> = (0..rows * row_width).map(|i| (i % 251) as f32).collect();
    DenseMemoryArray::new(schema, vec![ValueBuffer::from_vec(values)]).unwrap()
}

/// Dense one-dimensional label array
pub fn dense_labels(rows: usize) -> DenseMemoryArray {
    let schema = ArraySchema::dense(
        vec![Dimension::new("rows", rows)],
        vec![Attribute::new("label", DataType::Int64)],
    )
    .unwrap();
    let values: Vec<i64> = (0..rows as i64).collect();
    DenseMemoryArray::new(schema, vec![ValueBuffer::from_vec(values)]).unwrap()
}

/// Sparse feature array with `nnz_per_row` cells scattered across each row
pub fn sparse_features(rows: usize, row_width: usize, nnz_per_row: usize) -> SparseMemoryArray {
    let schema = ArraySchema::sparse(
        vec![
            Dimension::new("rows", rows),
            Dimension::new("cols", row_width),
        ],
        vec![Attribute::new("features", DataType::Float32)],
    )
    .unwrap();

    let nnz = rows * nnz_per_row;
    let mut row_coords = Vec::with_capacity(nnz);
    let mut col_coords = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    for r in 0..rows {
        for k in 0..nnz_per_row {
            row_coords.push(r as u64);
            col_coords.push(((r + k * 7) % row_width) as u64);
            values.push((r + k) as f32);
        }
    }

    SparseMemoryArray::new(
        schema,
        vec![row_coords, col_coords],
        vec![ValueBuffer::from_vec(values)],
    )
    .unwrap()
}

/// Benchmark the window plan on its own
pub fn bench_window_plan(config: &BenchConfig) -> BenchResult {
    run_benchmark("Window Plan", config, || {
        let windower = DualStreamWindower::new(
            config.x_buffer_size,
            config.y_buffer_size,
            RowRange::new(0, config.rows),
        )?;

        let mut total = 0usize;
        for window in windower.windows() {
            total += window.x.extract_slice.len();
        }
        if total != config.rows {
            return Err(Error::InvalidArgument("window plan lost rows".to_string()));
        }
        Ok(())
    })
}

/// Benchmark the dense two-stream pipeline end to end
pub fn bench_dense_pipeline(config: &BenchConfig) -> BenchResult {
    let x = dense_features(config.rows, config.row_width);
    let y = dense_labels(config.rows);

    run_benchmark("Dense Pipeline", config, || {
        let sequencer = BatchSequencer::new(
            &x,
            &y,
            SequencerOptions {
                x_buffer_size: config.x_buffer_size,
                y_buffer_size: config.y_buffer_size,
                ..SequencerOptions::default()
            },
        )?;

        let mut rows_seen = 0usize;
        for batch in sequencer.batches()? {
            let batch = batch?;
            rows_seen += batch[0].shape()[0];
        }
        if rows_seen != config.rows {
            return Err(Error::InvalidArgument("pipeline lost rows".to_string()));
        }
        Ok(())
    })
}

/// Benchmark the sparse feature pipeline end to end
pub fn bench_sparse_pipeline(config: &BenchConfig) -> BenchResult {
    let x = sparse_features(config.rows, config.row_width, config.nnz_per_row);
    let y = dense_labels(config.rows);

    run_benchmark("Sparse Pipeline", config, || {
        let sequencer = BatchSequencer::new(
            &x,
            &y,
            SequencerOptions {
                x_buffer_size: config.x_buffer_size,
                y_buffer_size: config.y_buffer_size,
                ..SequencerOptions::default()
            },
        )?;

        let mut cells_seen = 0usize;
        for batch in sequencer.batches()? {
            let batch = batch?;
            let tensor = batch[0]
                .as_sparse()
                .ok_or_else(|| Error::InvalidArgument("expected a sparse tensor".to_string()))?;
            cells_seen += tensor.nnz();
        }
        if cells_seen != config.rows * config.nnz_per_row {
            return Err(Error::InvalidArgument("pipeline lost cells".to_string()));
        }
        Ok(())
    })
}
