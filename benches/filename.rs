use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use mv_organizer::filename::{MovieMetadata, decode_filename, encode_filename};
use mv_organizer::sort_key;

fn bench_decode(c: &mut Criterion) {
    c.bench_function("decode canonical filename", |b| {
        b.iter(|| decode_filename(black_box("[Acme Pictures] {The Long Saga 12} Finale, Part Two (Al, Bo, Cy).mkv")));
    });
    c.bench_function("decode opaque filename", |b| {
        b.iter(|| decode_filename(black_box("some_download.1080p.x265-GROUP.mkv")));
    });
}

fn bench_encode(c: &mut Criterion) {
    let metadata = MovieMetadata {
        studio: Some("Acme Pictures".to_string()),
        series: Some("The Long Saga".to_string()),
        series_number: Some(12),
        name: Some("Finale, Part Two".to_string()),
        actors: vec!["Cy".to_string(), "Al".to_string(), "Bo".to_string()],
    };
    c.bench_function("encode filename", |b| {
        b.iter(|| encode_filename(black_box(&metadata), black_box("old name.mkv")));
    });
}

fn bench_sort_key(c: &mut Criterion) {
    c.bench_function("sort key", |b| {
        b.iter(|| sort_key(black_box("The Quick, Brown Fox's 2nd Adventure!")));
    });
}

criterion_group!(benches, bench_decode, bench_encode, bench_sort_key);
criterion_main!(benches);
