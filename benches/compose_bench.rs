//! Throughput of each pipeline stage on generated documents.
//!
//! `scan` counts tokens, `parse` counts events and `compose` builds the
//! full node graph, so the differences between groups show the cost each
//! stage adds.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use yaml_engine::{compose, parse, LoadSettings, Scanner, StreamReader};

/// Block mappings of records with nested flow sequences
fn make_records(count: usize) -> String {
    let mut yaml = String::with_capacity(count * 80);
    yaml.push_str("defaults: &defaults\n  retries: 3\n  timeout: 1.5\n");
    yaml.push_str("records:\n");
    for i in 0..count {
        yaml.push_str(&format!(
            "  - id: {i}\n    name: \"record {i}\"\n    tags: [a, b, c]\n    <<: *defaults\n"
        ));
    }
    yaml
}

/// One long literal block scalar
fn make_literal(lines: usize) -> String {
    let mut yaml = String::from("text: |\n");
    for i in 0..lines {
        yaml.push_str(&format!("  line {} of a literal block scalar\n", i));
    }
    yaml
}

fn bench_stages(c: &mut Criterion) {
    // every record aliases the defaults mapping
    let settings = LoadSettings::default().with_max_aliases_for_collections(usize::MAX);
    let mut group = c.benchmark_group("pipeline/records");

    for &count in &[10, 100, 1000] {
        let yaml = make_records(count);
        group.throughput(Throughput::Bytes(yaml.len() as u64));

        group.bench_with_input(BenchmarkId::new("scan", count), &yaml, |b, yaml| {
            b.iter(|| {
                let reader = StreamReader::new(black_box(yaml), &settings);
                Scanner::new(reader, &settings).count()
            })
        });

        group.bench_with_input(BenchmarkId::new("parse", count), &yaml, |b, yaml| {
            b.iter(|| parse(black_box(yaml), &settings).count())
        });

        group.bench_with_input(BenchmarkId::new("compose", count), &yaml, |b, yaml| {
            b.iter(|| compose(black_box(yaml), &settings))
        });
    }

    group.finish();
}

fn bench_buffer_size(c: &mut Criterion) {
    let yaml = make_literal(2000);
    let mut group = c.benchmark_group("pipeline/buffer_size");
    group.throughput(Throughput::Bytes(yaml.len() as u64));

    for &size in &[16, 256, 1024, 8192] {
        let settings = LoadSettings::default().with_buffer_size(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &yaml, |b, yaml| {
            b.iter(|| compose(black_box(yaml), &settings))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_buffer_size);
criterion_main!(benches);
