//! Benchmarks for binary event map construction.
//!
//! Run with: cargo bench

use bem_core::{build_binary_event_map, BinaryEventMapBuilder, EventRecord, ScratchArena};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

const WIDTH: i32 = 320;
const HEIGHT: i32 = 240;

fn synthetic_events(count: usize) -> Vec<EventRecord> {
    // Deterministic spread over the frame with a few out-of-range events
    (0..count)
        .map(|i| {
            let i = i as i32;
            let x = (i * 7) % (WIDTH + 4);
            let y = (i * 13) % (HEIGHT + 2);
            EventRecord::new([i & 1, i, 0, 0, y, x])
        })
        .collect()
}

fn local_scratch_benchmark(c: &mut Criterion) {
    let events = synthetic_events(100_000);
    let mut map = vec![0u8; (WIDTH * HEIGHT) as usize];

    let mut group = c.benchmark_group("build_local");
    group.throughput(Throughput::Elements(events.len() as u64));

    group.bench_function("qvga_100k_events", |b| {
        b.iter(|| {
            let stats =
                build_binary_event_map(WIDTH, HEIGHT, black_box(&events), &mut map).unwrap();
            black_box(stats.active_pixels)
        })
    });

    group.finish();
}

fn shared_arena_benchmark(c: &mut Criterion) {
    let events = synthetic_events(100_000);
    let mut map = vec![0u8; (WIDTH * HEIGHT) as usize];
    let mut arena = ScratchArena::new(map.len() * 4);

    let mut group = c.benchmark_group("build_arena");
    group.throughput(Throughput::Elements(events.len() as u64));

    group.bench_function("qvga_100k_events", |b| {
        let mut builder = BinaryEventMapBuilder::new(&mut arena);
        b.iter(|| {
            let stats = builder
                .build(WIDTH, HEIGHT, black_box(&events), &mut map)
                .unwrap();
            black_box(stats.active_pixels)
        })
    });

    group.finish();
}

criterion_group!(benches, local_scratch_benchmark, shared_arena_benchmark);
criterion_main!(benches);
