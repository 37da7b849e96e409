//! Read Path Benchmarks
//!
//! Measures redacted bundle reads at typical kernel request sizes and the
//! cost of regenerating the map text.
//!
//! Run with:
//!   cargo bench --bench read_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use appimagelauncherfs::{redact, LauncherFs, Registry};
use std::fs;

fn create_bundle(path: &std::path::Path, size: usize) -> std::io::Result<()> {
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    fs::write(path, data)
}

fn bench_bundle_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_read");

    let temp_dir = tempfile::TempDir::new().unwrap();
    let bundle = temp_dir.path().join("bench.AppImage");
    create_bundle(&bundle, 4 * 1024 * 1024).unwrap();

    let lfs = LauncherFs::new(Registry::from_paths([&bundle]));

    for size in [4096u64, 128 * 1024] {
        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(BenchmarkId::new("head", size), &size, |b, &size| {
            b.iter(|| lfs.read(black_box("/0000.AppImage"), 0, size).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("middle", size), &size, |b, &size| {
            b.iter(|| {
                lfs.read(black_box("/0000.AppImage"), 2 * 1024 * 1024, size)
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_redact(c: &mut Criterion) {
    let mut buf = vec![0xAAu8; 4096];
    c.bench_function("redact_4k", |b| {
        b.iter(|| redact(black_box(&mut buf), black_box(5)))
    });
}

fn bench_map_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_text");

    for entries in [10usize, 1000] {
        let registry = Registry::from_paths(
            (0..entries).map(|i| format!("/home/user/Applications/app-{}.AppImage", i)),
        );
        let lfs = LauncherFs::new(registry);

        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            b.iter(|| lfs.getattr(black_box("/map")).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_bundle_reads, bench_redact, bench_map_text);
criterion_main!(benches);
