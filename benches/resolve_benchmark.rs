//! Resolution and listing benchmarks for StoreFs
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::fs;
use std::path::Path;
use storefs::{StoreFs, StoreList, StoreOps};
use tempfile::TempDir;

/// `stores` store directories with `files` files each, named `s{store}_{n}`,
/// plus a `shared` file in every store.
fn build_stores(stores: usize, files: usize) -> (TempDir, StoreFs) {
    let tmp = TempDir::new().unwrap();
    let mut roots = Vec::new();
    for s in 0..stores {
        let root = tmp.path().join(format!("store{}", s));
        fs::create_dir(&root).unwrap();
        for n in 0..files {
            fs::write(root.join(format!("s{}_{}", s, n)), b"x").unwrap();
        }
        fs::write(root.join("shared"), b"x").unwrap();
        roots.push(root);
    }
    let list = StoreList::new(&roots).unwrap();
    (tmp, StoreFs::new(list))
}

// === Resolution Benchmarks ===

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for stores in [1, 4, 16] {
        let (_tmp, fs) = build_stores(stores, 16);
        let last = format!("s{}_0", stores - 1);

        group.bench_with_input(BenchmarkId::new("first_store", stores), &stores, |b, _| {
            b.iter(|| fs.resolver().resolve(black_box(Path::new("shared"))).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("last_store", stores), &stores, |b, _| {
            b.iter(|| fs.resolver().resolve(black_box(Path::new(&last))).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("miss", stores), &stores, |b, _| {
            b.iter(|| fs.resolver().resolve(black_box(Path::new("absent"))).is_err());
        });
    }

    group.finish();
}

fn bench_getattr(c: &mut Criterion) {
    let (_tmp, fs) = build_stores(4, 16);
    c.bench_function("getattr_deep_path", |b| {
        b.iter(|| fs.getattr(black_box(Path::new("/a/b/c/s3_7"))).unwrap());
    });
}

// === Listing Benchmarks ===

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("listing");

    for files in [10, 100, 1000] {
        let (_tmp, fs) = build_stores(4, files);
        group.throughput(Throughput::Elements((4 * (files + 1)) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &files, |b, _| {
            b.iter(|| fs.list_entries().count());
        });
    }

    group.finish();
}

// === Handle I/O Benchmarks ===

fn bench_read_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_io");
    let (_tmp, fs) = build_stores(2, 0);
    let fh = fs.create(Path::new("io"), 0o644, libc::O_RDWR).unwrap();

    for size_kb in [4, 64] {
        let data = vec![42u8; size_kb * 1024];
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("write", format!("{}KB", size_kb)),
            &data,
            |b, data| b.iter(|| fs.write(&fh, 0, black_box(data)).unwrap()),
        );
        group.bench_with_input(
            BenchmarkId::new("read", format!("{}KB", size_kb)),
            &data.len(),
            |b, &len| b.iter(|| fs.read(&fh, 0, black_box(len)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resolve,
    bench_getattr,
    bench_listing,
    bench_read_write
);
criterion_main!(benches);
