//! Benchmarks for fallback execution.

use capflow::prelude::*;
use capflow::testing::{FailingImplementation, SuccessImplementation};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn executor_with_failures(failures: u32) -> FallbackExecutor {
    let mut registry = CapabilityRegistry::new();
    for rank in 0..failures {
        registry
            .register(
                "op",
                FailingImplementation::new(format!("broken-{rank}"), ErrorCategory::Unsupported, "missing"),
                rank,
            )
            .unwrap();
    }
    registry
        .register("op", SuccessImplementation::new("working", json!("ok")), failures)
        .unwrap();
    FallbackExecutor::new(registry.freeze())
}

fn fallback_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    let first_rank = executor_with_failures(0);
    c.bench_function("execute_first_rank", |b| {
        b.iter(|| {
            runtime
                .block_on(first_rank.execute("op", black_box(json!({})), None))
                .unwrap()
        })
    });

    let fallback = executor_with_failures(4);
    c.bench_function("execute_after_four_failures", |b| {
        b.iter(|| {
            runtime
                .block_on(fallback.execute("op", black_box(json!({})), None))
                .unwrap()
        })
    });

    let result = runtime
        .block_on(fallback.execute("op", json!({}), None))
        .unwrap();
    c.bench_function("render_report", |b| b.iter(|| Reporter::render(black_box(&result))));
}

criterion_group!(benches, fallback_benchmark);
criterion_main!(benches);
