use criterion::{criterion_group, criterion_main, Criterion};
use probably::countminsketch::CountMinSketch;

fn countminsketch_increment_single(c: &mut Criterion) {
    c.bench_function("countminsketch_increment_single", |b| {
        let mut cms = CountMinSketch::with_params(2014, 5).unwrap();
        let obj = "foo bar";

        b.iter(|| {
            cms.increment(obj);
        })
    });
}

fn countminsketch_count_single(c: &mut Criterion) {
    c.bench_function("countminsketch_count_single", |b| {
        let mut cms = CountMinSketch::with_params(2014, 5).unwrap();
        cms.add("foo bar", 42);
        let obj = "foo bar";

        b.iter(|| cms.count(obj))
    });
}

criterion_group!(
    benches,
    countminsketch_increment_single,
    countminsketch_count_single
);
criterion_main!(benches);
