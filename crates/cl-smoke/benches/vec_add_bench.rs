use std::io;

use cl_smoke::{Backend, HostBackend, INPUT_A, INPUT_B, RunConfig, run, vector_add};
use cl_smoke::backend::ComputeContext;
use cl_smoke::kernel::{KERNEL_NAME, SIMPLE_ADD};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_full_run(c: &mut Criterion) {
    let config = RunConfig::default();
    c.bench_function("host_full_run", |b| {
        b.iter(|| {
            let backend = HostBackend::reference();
            run(&backend, black_box(&config), &mut io::sink())
        })
    });
}

fn bench_vector_add(c: &mut Criterion) {
    let backend = HostBackend::reference();
    let platform = &backend.platforms().expect("host platforms")[0];
    let device = backend.devices(platform).expect("host devices").remove(0);
    let context = backend.create_context(&device).expect("host context");
    let program = context.build_program(SIMPLE_ADD).expect("host build");

    c.bench_function("host_vector_add", |b| {
        b.iter(|| vector_add(&context, &program, KERNEL_NAME, black_box(&INPUT_A), black_box(&INPUT_B)))
    });
}

criterion_group!(benches, bench_full_run, bench_vector_add);
criterion_main!(benches);
