//! Benchmark runner for the batch generation pipeline

use arrayfeed_bench::{
    bench_dense_pipeline, bench_sparse_pipeline, bench_window_plan, BenchConfig, BenchResult,
};

fn print_result(result: &BenchResult) {
    println!("\nBenchmark: {}", result.name);
    println!("  Total time:   {:?}", result.total_time);
    println!("  Average time: {:?}", result.avg_time);
    println!("  Min time:     {:?}", result.min_time);
    println!("  Max time:     {:?}", result.max_time);
    println!("  Throughput:   {:.2} rows/sec", result.throughput);
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Batch Generation Benchmarks ===");

    let config = BenchConfig::default();
    print_result(&bench_window_plan(&config));
    print_result(&bench_dense_pipeline(&config));
    print_result(&bench_sparse_pipeline(&config));

    // How buffer sizing moves dense throughput
    println!("\n=== Buffer Size Sweep ===");
    for buffer in [256, 1024, 4096, 16384] {
        let config = BenchConfig {
            x_buffer_size: buffer,
            y_buffer_size: buffer / 4,
            ..BenchConfig::default()
        };

        let result = bench_dense_pipeline(&config);
        println!("\nBuffers: {} feature rows, {} label rows", buffer, buffer / 4);
        println!("  Average time: {:?}", result.avg_time);
        println!("  Throughput:   {:.2} rows/sec", result.throughput);
    }

    // How row width moves dense throughput
    println!("\n=== Row Width Sweep ===");
    for row_width in [8, 32, 128] {
        let config = BenchConfig {
            row_width,
            ..BenchConfig::default()
        };

        let result = bench_dense_pipeline(&config);
        println!("\nRow width: {} cells", row_width);
        println!("  Average time: {:?}", result.avg_time);
        println!("  Throughput:   {:.2} rows/sec", result.throughput);
    }
}
