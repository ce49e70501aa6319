use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hps_exp::{decode, encode};

fn bench_codec(c: &mut Criterion) {
    let cardinalities = [3u64, 7, 2, 11, 5, 4];
    c.bench_function("codec_encode", |b| {
        let mut index = 0u64;
        b.iter(|| {
            index = index.wrapping_add(7919);
            black_box(encode(black_box(index), &cardinalities).expect("encode"));
        });
    });
    let coordinate = encode(12_345, &cardinalities).expect("encode");
    c.bench_function("codec_decode", |b| {
        b.iter(|| black_box(decode(black_box(&coordinate), &cardinalities).expect("decode")));
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
