//! Property-based tests for the bounded telemetry store.
//!
//! Invariants tested:
//! - No buffer ever exceeds its capacity
//! - Buffers keep the newest samples in arrival order
//! - Eviction is idempotent and leaves unknown-entity snapshots empty

use proptest::prelude::*;
use warden_core::{BufferKind, RingBuffer, SeriesKind, TelemetryStore};
use warden_shared::{EntityId, Vec3};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn ring_keeps_newest_in_order(capacity in 1usize..64, values in prop::collection::vec(any::<i64>(), 0..200)) {
        let mut ring = RingBuffer::new(capacity);
        for &v in &values {
            ring.push(v);
            prop_assert!(ring.len() <= capacity);
        }
        let expected: Vec<i64> = values.iter().copied().skip(values.len().saturating_sub(capacity)).collect();
        prop_assert_eq!(ring.to_vec(), expected);
    }

    #[test]
    fn store_buffers_bounded(
        capacity in 1usize..32,
        writes in prop::collection::vec((0u64..4, -10.0f64..10.0), 0..300),
    ) {
        let store = TelemetryStore::with_capacity(capacity);
        for &(id, value) in &writes {
            store.record_velocity(EntityId(id), Vec3::new(value, 0.0, 0.0));
            store.record_series(EntityId(id), SeriesKind::ClickIntervals, value);
        }
        for id in 0..4 {
            prop_assert!(store.velocities(EntityId(id)).len() <= capacity);
            prop_assert!(store.series(EntityId(id), SeriesKind::ClickIntervals).len() <= capacity);
        }
    }

    #[test]
    fn evict_is_idempotent(id in any::<u64>(), samples in 1usize..20) {
        let store = TelemetryStore::new();
        let entity = EntityId(id);
        for _ in 0..samples {
            store.record_velocity(entity, Vec3::ZERO);
        }
        prop_assert!(store.evict(entity));
        prop_assert!(!store.evict(entity));
        prop_assert!(store.snapshot(entity, BufferKind::Velocity).is_empty());
    }
}
