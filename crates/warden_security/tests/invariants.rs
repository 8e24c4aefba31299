//! Property-based invariants of the detection pipeline.
//!
//! Invariants tested:
//! - Every detector score lies in [0, 100] for arbitrary input
//! - Model thresholds stay in [0, 1] under arbitrary training
//! - Reputation stays in [0, 100] under arbitrary violation/reward streams
//! - Physics prediction is deterministic
//! - History buffers never exceed their capacity

use std::sync::Arc;

use proptest::prelude::*;
use warden_core::{PatternType, TelemetryStore};
use warden_security::physics::{self, EntityState, Medium};
use warden_security::{
    DetectionModel, GroundClaim, MovementValidator, PatternEngine, PositionReading,
    ReputationLedger, RotationReading, Violation,
};
use warden_shared::constants::HISTORY_CAPACITY;
use warden_shared::{EntityId, Vec3};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn any_coord() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1_000.0f64..1_000.0,
        Just(0.0),
        Just(f64::NAN),
        Just(f64::INFINITY),
        any::<f64>(),
    ]
}

fn any_vec3() -> impl Strategy<Value = Vec3> {
    (any_coord(), any_coord(), any_coord()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn any_pattern() -> impl Strategy<Value = PatternType> {
    prop::sample::select(PatternType::ALL.to_vec())
}

fn in_range(score: f64) -> bool {
    (0.0..=100.0).contains(&score)
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn movement_scores_bounded(
        moves in prop::collection::vec((any_vec3(), any_vec3(), any::<bool>(), any::<bool>()), 1..80),
    ) {
        let store = Arc::new(TelemetryStore::new());
        let validator = MovementValidator::new(Arc::clone(&store));
        let entity = EntityId(1);
        let mut previous = Vec3::ZERO;

        for (i, (position, velocity, claimed, server)) in moves.into_iter().enumerate() {
            let ts = i as u64 * 50;
            let p = validator.check_position_spoof(
                entity,
                PositionReading { position, timestamp_ms: ts },
                PositionReading { position: previous, timestamp_ms: ts },
            );
            let r = validator.check_rotation_spoof(
                entity,
                RotationReading { yaw: position.x, pitch: position.y, timestamp_ms: ts },
                RotationReading { yaw: previous.x, pitch: previous.y, timestamp_ms: ts },
            );
            let v = validator.check_velocity_spoof(entity, velocity, previous, server);
            let g = validator.check_ground_spoof(
                entity,
                GroundClaim { claimed_on_ground: claimed, server_on_ground: server },
            );
            for score in [p, r, v, g] {
                prop_assert!(in_range(score), "score {} out of range", score);
            }
            previous = position;
        }

        prop_assert!(store.positions(entity).len() <= HISTORY_CAPACITY);
        prop_assert!(store.rotations(entity).len() <= HISTORY_CAPACITY);
        prop_assert!(store.velocities(entity).len() <= HISTORY_CAPACITY);
    }

    #[test]
    fn pattern_scores_bounded(
        pattern in any_pattern(),
        values in prop::collection::vec(any_coord(), 0..40),
    ) {
        let engine = PatternEngine::new(Arc::new(TelemetryStore::new()));
        let score = engine.match_pattern(EntityId(3), pattern, &values, 0);
        prop_assert!(in_range(score), "{} scored {} for {:?}", pattern.name(), score, values);
    }
}

// ---------------------------------------------------------------------------
// Model and reputation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn threshold_stays_in_unit_interval(
        samples in prop::collection::vec(
            (prop::collection::vec(prop_oneof![-2.0f64..3.0, any::<f64>()], 0..4), any::<bool>()),
            0..300,
        ),
    ) {
        let mut model = DetectionModel::new();
        for (features, is_cheat) in samples {
            let score = model.predict(&features);
            prop_assert!(in_range(score));
            model.train(features, is_cheat);
            prop_assert!((0.0..=1.0).contains(&model.threshold()));
            prop_assert!((0.0..=1.0).contains(&model.accuracy()));
        }
    }

    #[test]
    fn reputation_stays_bounded(events in prop::collection::vec(any::<bool>(), 0..400)) {
        let ledger = ReputationLedger::new();
        for (i, violation) in events.into_iter().enumerate() {
            let reputation = if violation {
                ledger.add_violation(Violation {
                    identity: "subject".into(),
                    check_name: "fuzz".into(),
                    severity: 90.0,
                    timestamp_ms: i as u64,
                    details: String::new(),
                }).unwrap()
            } else {
                ledger.record_clean_interval("subject").unwrap()
            };
            prop_assert!((0.0..=100.0).contains(&reputation));
        }
    }

    #[test]
    fn prediction_is_deterministic(
        velocity in any_vec3(),
        on_ground in any::<bool>(),
        medium in prop::sample::select(vec![Medium::Air, Medium::Liquid, Medium::Lava]),
    ) {
        let state = EntityState { velocity, on_ground, ..Default::default() };
        let first = physics::predict(&state, medium).to_array();
        let second = physics::predict(&state, medium).to_array();
        for (a, b) in first.iter().zip(second.iter()) {
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
