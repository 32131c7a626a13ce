//! Pixel loop throughput, sequential against row-parallel.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pixgraph::prelude::*;

/// texture -> 3x3 convolution -> grayscale -> binarize -> gray_to_rgb -> output
fn edge_graph(size: u32) -> Graph {
    let mut source = Texture::new(64, 64);
    for y in 0..64 {
        for x in 0..64 {
            source.set(x, y, Color::rgb((x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8));
        }
    }

    let mut graph = Graph::new();
    graph
        .add_node("tex", Box::new(TextureSource::new(source)))
        .unwrap();
    graph
        .register_node(
            "kernel",
            "matrix3",
            &[Attribute::named("mat", "-1 -1 -1 -1 8 -1 -1 -1 -1")],
        )
        .unwrap();
    graph.register_node("conv", "matrix_sample", &[]).unwrap();
    graph.register_node("gray", "grayscale", &[]).unwrap();
    graph.register_node("bin", "binarize", &[]).unwrap();
    graph.register_node("rgb", "gray_to_rgb", &[]).unwrap();
    graph.add_node("out", Box::new(OutputNode::new(size, size))).unwrap();

    graph.bind("tex", "Tex", "conv", "Tex").unwrap();
    graph.bind("kernel", "Out", "conv", "Mat").unwrap();
    graph.bind("conv", "Out", "gray", "In").unwrap();
    graph.bind("gray", "Out", "bin", "In").unwrap();
    graph.bind("bin", "Out", "rgb", "In").unwrap();
    graph.bind("rgb", "Out", "out", "In").unwrap();
    graph
}

fn render_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.sample_size(10);
    group.warm_up_time(std::time::Duration::from_secs(1));
    group.measurement_time(std::time::Duration::from_secs(3));

    for size in [64u32, 256, 512].iter() {
        let mut graph = edge_graph(*size);
        graph.compute_order().unwrap();
        group.throughput(Throughput::Elements(u64::from(*size) * u64::from(*size)));

        let sequential = ExecutionEngine::new();
        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| black_box(sequential.execute(&mut graph).unwrap()));
        });

        let parallel = ExecutionEngine::with_options(ExecutionOptions::new().with_parallel(true));
        group.bench_with_input(BenchmarkId::new("parallel", size), size, |b, _| {
            b.iter(|| black_box(parallel.execute(&mut graph).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, render_benchmark);
criterion_main!(benches);
