//! Per-row vs batched log loading
//!
//! Run with: cargo bench -p songplay-core --bench load_modes

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tempfile::TempDir;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use songplay_core::etl::{LoadMode, process_log_file};
use songplay_core::store::{DuckDbStore, Store};

/// Write one log file of `events` NextSong events spread over 500 users
fn generate_log_file(dir: &TempDir, events: usize) -> PathBuf {
    let path = dir.path().join(format!("events_{:06}.json", events));
    let file = File::create(&path).expect("Failed to create file");
    let mut writer = BufWriter::new(file);

    for i in 0..events {
        writeln!(
            writer,
            r#"{{"artist":"Artist {}","firstName":"User","gender":"F","lastName":"{}","level":"{}","location":"Somewhere","page":"NextSong","sessionId":{},"song":"Song {}","ts":{},"userAgent":"bench","userId":"{}"}}"#,
            i % 97,
            i % 500,
            if i % 3 == 0 { "paid" } else { "free" },
            i / 10,
            i % 211,
            1541105830796_i64 + (i as i64 / 2) * 1000,
            i % 500
        )
        .expect("Failed to write record");
    }

    path
}

fn bench_load_modes(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut group = c.benchmark_group("log_file");
    group.sample_size(10);

    for events in [1_000, 10_000] {
        let path = generate_log_file(&dir, events);

        for mode in [LoadMode::PerRow, LoadMode::Batched] {
            group.bench_with_input(
                BenchmarkId::new(mode.to_string(), events),
                &path,
                |b, path| {
                    b.iter(|| {
                        let mut store = DuckDbStore::memory().expect("Failed to open duckdb");
                        store.create_tables().expect("Failed to create tables");
                        store.begin().expect("Failed to begin");
                        process_log_file(&mut store, path, mode, 100).expect("Load failed");
                        store.commit().expect("Failed to commit");
                    })
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_load_modes);
criterion_main!(benches);
