//! # Telemetry Store Benchmark
//!
//! ARCHITECT'S REQUIREMENTS:
//! - 500 entities recording at 20 Hz
//! - One tick of recording well under 1ms
//!
//! Run with: `cargo bench --package warden_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use warden_core::{BufferKind, PositionSample, SeriesKind, TelemetryStore};
use warden_shared::{EntityId, Vec3};

/// Entities recorded per simulated tick.
const ENTITY_COUNT: u64 = 500;

/// Benchmark: one tick of position + velocity recording for every entity.
fn bench_record_tick(c: &mut Criterion) {
    let store = TelemetryStore::new();

    c.bench_function("record_tick_500", |b| {
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            for id in 0..ENTITY_COUNT {
                let entity = EntityId(id);
                store.record_position(
                    entity,
                    PositionSample {
                        position: Vec3::new(tick as f64 * 0.2, 64.0, id as f64),
                        distance_from_prev: 0.2,
                        timestamp_ms: tick * 50,
                    },
                );
                store.record_velocity(entity, Vec3::new(0.2, 0.0, 0.0));
            }
        });
    });
}

/// Benchmark: snapshot copy cost as history fills.
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_series");

    for fill in [10u32, 50] {
        let store = TelemetryStore::new();
        for i in 0..fill {
            store.record_series(EntityId(1), SeriesKind::ClickIntervals, f64::from(i));
        }

        group.bench_with_input(BenchmarkId::from_parameter(fill), &fill, |b, _| {
            b.iter(|| {
                black_box(store.snapshot(EntityId(1), BufferKind::Series(SeriesKind::ClickIntervals)))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record_tick, bench_snapshot);
criterion_main!(benches);
