//! # VM Benchmarks
//!
//! Measures instruction dispatch, loop execution and the cooperative scheduler.
//!
//! Run: `cargo bench --bench vm_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqvm_core::prelude::*;

fn quiet_vm() -> VirtualMachine {
    VirtualMachine::new(VmConfig::default(), Logger::new(NullSink))
}

fn code() -> CodeBuilder {
    CodeBuilder::new("bench.sqf")
}

/// `x = 1 + 2 * 3` executed unscheduled
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let script = code().push(1).push(2).push(3).binary("*").binary("+").assign("x").end().build();
    group.bench_function("arithmetic_statement", |b| {
        let mut vm = quiet_vm();
        b.iter(|| black_box(vm.execute_unscheduled(script.clone())))
    });

    let lookup = code().get("x").get("x").binary("+").assign("y").end().build();
    group.bench_function("variable_lookup", |b| {
        let mut vm = quiet_vm();
        vm.execute_unscheduled(code().push(1).assign("x").end().build());
        b.iter(|| black_box(vm.execute_unscheduled(lookup.clone())))
    });

    group.finish();
}

/// `for "_i" from 1 to N do { x = x + _i }`
fn bench_for_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("for_loop");

    for iterations in [10, 100, 1000] {
        let body = code().get("x").get("_i").binary("+").assign("x").end().build();
        let script = code()
            .push(0)
            .assign("x")
            .end()
            .push("_i")
            .unary("for")
            .push(1)
            .binary("from")
            .push(iterations)
            .binary("to")
            .code(body)
            .binary("do")
            .end()
            .build();

        group.bench_with_input(BenchmarkId::new("sum", iterations), &script, |b, script| {
            let mut vm = quiet_vm();
            b.iter(|| black_box(vm.execute_unscheduled(script.clone())))
        });
    }

    group.finish();
}

/// Many short handles driven through one turn
fn bench_scheduler(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler");

    for handles in [10, 100, 1000] {
        let script = code().get("n").push(1).binary("+").assign("n").end().build();

        group.bench_with_input(BenchmarkId::new("turn", handles), &handles, |b, &handles| {
            b.iter(|| {
                let mut vm = quiet_vm();
                vm.execute_unscheduled(code().push(0).assign("n").end().build());
                for _ in 0..handles {
                    vm.spawn(script.clone());
                }
                black_box(vm.run_turn())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_for_loop, bench_scheduler);
criterion_main!(benches);
