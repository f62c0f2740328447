use criterion::{criterion_group, criterion_main, Criterion};
use quill::Quill;

fn fibonacci() {
    let src = r#"
        fun fib(n) {
            if (n < 2) { return n; }
            return fib(n - 2) + fib(n - 1);
        }

        fib(20);
    "#;

    let mut quill = Quill::new();
    quill.run(src).unwrap();
}

fn counting_loop() {
    let src = r#"
        var sum = 0;
        var i = 0;
        while (i < 100000) {
            i = i + 1;
            if (i == 99999) { continue; }
            sum = sum + i;
        }
    "#;

    let mut quill = Quill::new();
    quill.run(src).unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("my-benchmark");
    group.sample_size(20);
    group.bench_function("fib 20", |b| b.iter(fibonacci));
    group.bench_function("counting loop", |b| b.iter(counting_loop));
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
