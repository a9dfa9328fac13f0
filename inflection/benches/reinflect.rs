//! 活用のベンチマーク
//!
//! テスト用の小さな英語辞書を構築し、構築直後の辞書とアーカイブ版の辞書で
//! 単語の活用速度を計測します。

use std::hint::black_box;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use inflection_rkyv::{Dictionary, DictionaryBuilder};

const GRAMMEME_CSV: &str = include_str!("../src/tests/resources/grammeme.csv");
const INFLECTION_CSV: &str = include_str!("../src/tests/resources/inflection.csv");
const LEXICON_CSV: &str = include_str!("../src/tests/resources/lexicon.csv");

const REQUESTS: &[(&str, &[&str])] = &[
    ("cat", &["plural"]),
    ("cats", &["singular", "genitive"]),
    ("City", &["plural"]),
    ("GOOSE", &["plural"]),
    ("geese", &["singular"]),
    ("walk", &["third", "singular"]),
    ("dog", &["plural"]),
];

fn build() -> Dictionary {
    let dict = DictionaryBuilder::from_readers(
        GRAMMEME_CSV.as_bytes(),
        INFLECTION_CSV.as_bytes(),
        LEXICON_CSV.as_bytes(),
        "en",
    )
    .unwrap();
    Dictionary::from_inner(dict)
}

fn bench_inflect(c: &mut Criterion) {
    let owned = build();
    let mut buffer = vec![];
    owned.write(&mut buffer).unwrap();
    let archived = Dictionary::read(buffer.as_slice()).unwrap();

    let mut group = c.benchmark_group("Inflect");
    group.throughput(Throughput::Elements(REQUESTS.len() as u64));
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    for (name, dict) in [("Owned", &owned), ("Archived", &archived)] {
        group.bench_function(BenchmarkId::new(name, "Requests"), |b| {
            b.iter(|| {
                for &(word, constraints) in REQUESTS {
                    black_box(dict.inflect(word, constraints, &[]).unwrap());
                }
            });
        });
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut buffer = vec![];
    build().write(&mut buffer).unwrap();

    c.bench_function("Read archived dictionary", |b| {
        b.iter(|| Dictionary::read(black_box(buffer.as_slice())).unwrap());
    });
}

criterion_group!(benches, bench_inflect, bench_load);
criterion_main!(benches);
