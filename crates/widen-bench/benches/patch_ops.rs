//! Criterion benchmarks for routine patching and evaluation.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use widen_core::RoutineId;
use widen_engine::host_targets;
use widen_patch::{Accessors, ConstantPatcher, Op, PatchLedger};
use widen_test_utils::fixtures::{deserialize_routine, host_routines};

/// Benchmark: patch and revert every host target.
fn bench_patch_revert_host(c: &mut Criterion) {
    let plan = widen_bench::reference_profile();
    let targets = host_targets(&plan);
    let table = Arc::new(host_routines(plan.original()));

    c.bench_function("patch_revert_host", |b| {
        b.iter(|| {
            let mut ledger = PatchLedger::new();
            for target in &targets {
                ledger.apply(&table, target, plan.expanded() as i32).unwrap();
            }
            black_box(ledger.revert_all());
        });
    });
}

/// Benchmark: splice the deserializer.
fn bench_splice(c: &mut Criterion) {
    let routine = deserialize_routine(262_144);

    c.bench_function("splice_deserialize", |b| {
        b.iter(|| {
            let spliced = ConstantPatcher
                .splice(&routine, &Op::LdcI4(4096), &Op::StLoc(2), "size")
                .unwrap();
            black_box(spliced);
        });
    });
}

/// Benchmark: invoke a patched routine through the table.
fn bench_invoke_patched(c: &mut Criterion) {
    let plan = widen_bench::reference_profile();
    let table = Arc::new(host_routines(plan.original()));
    let mut ledger = PatchLedger::new();
    for target in &host_targets(&plan) {
        ledger.apply(&table, target, plan.expanded() as i32).unwrap();
    }
    let mut accessors = Accessors::new();
    accessors.register(widen_engine::DESERIALIZE_SIZE_ACCESSOR, move || {
        i64::from(plan.expanded())
    });
    let id = RoutineId::new("PathManager.Data", "Deserialize");

    c.bench_function("invoke_patched_deserialize", |b| {
        b.iter(|| black_box(table.invoke(&id, &[], &accessors).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_patch_revert_host,
    bench_splice,
    bench_invoke_patched
);
criterion_main!(benches);
