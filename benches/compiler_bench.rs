use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nncc::codegen::codegen;
use nncc::loader::load;
use nncc::registry::OpRegistry;

// KPI-aligned benchmark scenarios.
// All scenarios are valid with the built-in operator set.

const SINGLE_NODE: &str = r#"{
    "inputs": ["X", "var"],
    "outputs": ["out"],
    "tensors": [
        {"name": "X", "dtype": "float", "shape": [1, 4, 8, 8]},
        {"name": "var", "dtype": "float", "shape": [4]},
        {"name": "scale", "dtype": "float", "shape": [4], "data": [1.0, 2.0, 3.0, 4.0]},
        {"name": "bias", "dtype": "float", "shape": [4], "data": [0.1, 0.2, 0.3, 0.4]},
        {"name": "mean", "dtype": "float", "shape": [4], "data": [0.0, 0.0, 0.0, 0.0]}
    ],
    "nodes": [
        {"name": "bn0", "op": "BatchNormalization",
         "inputs": ["X", "scale", "bias", "mean", "var"],
         "outputs": ["out"]}
    ]
}"#;

const FOLDED_STATS: &str = r#"{
    "inputs": ["X"],
    "outputs": ["out"],
    "tensors": [
        {"name": "X", "dtype": "float", "shape": [2, 3, 16]},
        {"name": "var", "dtype": "float", "shape": [3], "data": [4.0, 9.0, 16.0]},
        {"name": "scale", "dtype": "float", "shape": [3], "data": [1.0, 1.0, 1.0]},
        {"name": "bias", "dtype": "float", "shape": [3], "data": [0.0, 0.0, 0.0]},
        {"name": "mean", "dtype": "float", "shape": [3], "data": [0.5, 0.5, 0.5]}
    ],
    "nodes": [
        {"name": "bn0", "op": "BatchNormalization",
         "inputs": ["X", "scale", "bias", "mean", "var"],
         "outputs": ["out"],
         "attributes": [{"name": "epsilon", "type": "float", "value": 0.001}]}
    ]
}"#;

fn scenarios() -> [(&'static str, &'static str); 2] {
    [("single_node", SINGLE_NODE), ("folded_stats", FOLDED_STATS)]
}

/// Scaling generator: a chain of normalization nodes feeding each other.
/// Every node reuses the same constant statistics, so only the chain
/// length varies. Intermediate tensors are produced by the nodes, not
/// declared up front.
fn generate_chain(n_nodes: usize) -> String {
    let tensors = String::from(
        r#"{"name": "X", "dtype": "float", "shape": [1, 2, 4]},
        {"name": "var", "dtype": "float", "shape": [2]},
        {"name": "scale", "dtype": "float", "shape": [2], "data": [2.0, 2.0]},
        {"name": "bias", "dtype": "float", "shape": [2], "data": [0.5, 0.5]},
        {"name": "mean", "dtype": "float", "shape": [2], "data": [1.0, 1.0]}"#,
    );
    let mut nodes = String::new();
    for n in 0..n_nodes {
        let input = if n == 0 {
            "X".to_string()
        } else {
            format!("h{}", n - 1)
        };
        let output = if n == n_nodes - 1 {
            "out".to_string()
        } else {
            format!("h{}", n)
        };
        if n > 0 {
            nodes.push_str(",\n        ");
        }
        nodes.push_str(&format!(
            r#"{{"name": "bn{n}", "op": "BatchNormalization",
         "inputs": ["{input}", "scale", "bias", "mean", "var"],
         "outputs": ["{output}"]}}"#,
        ));
    }
    format!(
        r#"{{
    "inputs": ["X", "var"],
    "outputs": ["out"],
    "tensors": [
        {tensors}
    ],
    "nodes": [
        {nodes}
    ]
}}"#,
    )
}

// KPI: graph load latency for representative scenarios.
fn bench_kpi_load_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/load_latency");
    let registry = OpRegistry::with_builtin_ops();

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let graph = load(black_box(source), &registry).expect("benchmark scenario must load");
                black_box(&graph);
            });
        });
    }

    group.finish();
}

// KPI: full compile latency (load -> resolve -> codegen).
fn bench_kpi_full_compile_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/full_compile_latency");
    let registry = OpRegistry::with_builtin_ops();

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let mut graph =
                    load(black_box(source), &registry).expect("benchmark scenario must load");
                let generated = codegen(&mut graph).expect("benchmark scenario must compile");
                black_box(generated);
            });
        });
    }

    group.finish();
}

// KPI: codegen latency in isolation (setup: load).
fn bench_kpi_codegen_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/codegen_latency");
    let registry = OpRegistry::with_builtin_ops();

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter_batched(
                || load(source, &registry).expect("benchmark scenario must load"),
                |mut graph| {
                    let generated =
                        codegen(black_box(&mut graph)).expect("benchmark scenario must compile");
                    black_box(generated);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// KPI: compile scaling vs chain length.
fn bench_kpi_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/compile_scaling");
    let registry = OpRegistry::with_builtin_ops();

    for n_nodes in [1_usize, 5, 10, 20, 40] {
        let source = generate_chain(n_nodes);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}nodes", n_nodes)),
            &source,
            |b, source| {
                b.iter(|| {
                    let mut graph = load(black_box(source.as_str()), &registry)
                        .expect("benchmark scenario must load");
                    let generated = codegen(&mut graph).expect("benchmark scenario must compile");
                    black_box(generated);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kpi_load_latency,
    bench_kpi_full_compile_latency,
    bench_kpi_codegen_latency,
    bench_kpi_compile_scaling,
);
criterion_main!(benches);
