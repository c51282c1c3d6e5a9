use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gs2compiler::prelude::*;

const SOURCE: &str = include_str!("../tests/inventory.gs2");

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("compile inventory", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            let len = ctx
                .compile(black_box(SOURCE), "weapon", "Inventory")
                .map(CompileResult::bytecode_len)
                .unwrap_or_default();
            black_box(len)
        })
    });

    c.bench_function("compile raw", |b| {
        b.iter(|| black_box(gs2compiler::compile_str(black_box(include_str!("../tests/control.gs2")))))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
