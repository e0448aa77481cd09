use criterion::{criterion_group, criterion_main, Criterion};
use probably::filters::bloomfilter::BloomFilter;

fn bloomfilter_add_single(c: &mut Criterion) {
    c.bench_function("bloomfilter_add_single", |b| {
        let false_positive_rate = 0.02; // = 2%
        let expected_elements = 1000;
        let mut filter =
            BloomFilter::with_properties(expected_elements, false_positive_rate).unwrap();
        let obj = "foo bar";

        b.iter(|| {
            filter.add(obj);
        })
    });
}

fn bloomfilter_has_single(c: &mut Criterion) {
    c.bench_function("bloomfilter_has_single", |b| {
        let mut filter = BloomFilter::with_params(100, 7).unwrap();
        filter.add("foo bar");
        let obj = "foo bar";

        b.iter(|| filter.has(obj))
    });
}

criterion_group!(benches, bloomfilter_add_single, bloomfilter_has_single);
criterion_main!(benches);
