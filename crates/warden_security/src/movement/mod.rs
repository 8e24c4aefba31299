//! # Movement Validation
//!
//! Server-side checks of the movement a client reports.
//!
//! ## Philosophy
//!
//! NEVER trust the client. Each check:
//! 1. Records the observed sample in the entity's history
//! 2. Scores the sample against that history
//! 3. Sums its penalties and clamps the total to `[0, 100]`
//!
//! Recording and scoring happen under one profile lock, so two events for
//! the same entity processed on different threads cannot interleave.

use std::sync::Arc;

use warden_core::{EntityProfile, PositionSample, RotationSample, TelemetryStore};
use warden_shared::constants::{IDLE_VELOCITY_EPSILON, MAX_SUSPICION};
use warden_shared::{normalize_yaw, EntityId, Vec3};

// =============================================================================
// POSITION
// =============================================================================

/// Farthest legitimate single-step displacement.
pub const TELEPORT_DISTANCE: f64 = 10.0;
/// Penalty for exceeding [`TELEPORT_DISTANCE`].
const TELEPORT_PENALTY: f64 = 50.0;
/// Penalty for a frozen position while velocity says the entity moves.
const FROZEN_POSITION_PENALTY: f64 = 20.0;
/// Step distances examined for outliers.
const OUTLIER_WINDOW: usize = 5;
/// Fraction of outlying steps that triggers the penalty.
const OUTLIER_RATIO: f64 = 0.3;
/// Penalty for erratic step distances.
const OUTLIER_PENALTY: f64 = 30.0;

// =============================================================================
// ROTATION
// =============================================================================

/// Largest yaw change a single tick can produce before normalization.
const MAX_RAW_YAW_DELTA: f64 = 180.0;
/// Penalty for an impossible single-tick turn.
const IMPOSSIBLE_TURN_PENALTY: f64 = 25.0;
/// Penalty for a frozen rotation while moving.
const FROZEN_ROTATION_PENALTY: f64 = 15.0;
/// Rotation samples examined for aim lock.
const AIM_LOCK_WINDOW: usize = 10;
/// Fraction of frozen samples that counts as aim lock.
const AIM_LOCK_RATIO: f64 = 0.5;
/// Penalty for aim lock.
const AIM_LOCK_PENALTY: f64 = 35.0;
/// Rotation samples examined for snaps.
const SNAP_WINDOW: usize = 5;
/// Normalized yaw change that counts as a snap.
const SNAP_YAW_DELTA: f64 = 120.0;
/// Penalty for a snap.
const SNAP_PENALTY: f64 = 40.0;

// =============================================================================
// VELOCITY
// =============================================================================

/// Fastest legitimate horizontal speed on the ground.
const MAX_GROUND_SPEED: f64 = 1.0;
/// Penalty for exceeding [`MAX_GROUND_SPEED`] while grounded.
const GROUND_SPEED_PENALTY: f64 = 25.0;
/// Largest legitimate change of speed between two ticks.
const MAX_SPEED_CHANGE: f64 = 0.5;
/// Penalty for an abrupt speed change.
const SPEED_CHANGE_PENALTY: f64 = 15.0;
/// Velocity samples examined against the hard ceiling.
const CEILING_WINDOW: usize = 3;
/// Hard velocity ceiling (units/tick).
pub const VELOCITY_CEILING: f64 = 2.0;
/// Penalty for breaking the ceiling.
const CEILING_PENALTY: f64 = 50.0;

// =============================================================================
// GROUND
// =============================================================================

/// Penalty per false grounded claim.
const GROUND_SPOOF_PENALTY: f64 = 30.0;
/// Spoof count above which the entity is a repeat offender.
const REPEAT_OFFENDER_COUNT: u64 = 5;
/// Extra penalty for repeat offenders.
const REPEAT_OFFENDER_PENALTY: f64 = 20.0;

/// Score given to a sample with non-finite components.
const MALFORMED_SAMPLE_SCORE: f64 = MAX_SUSPICION;

/// A reported position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PositionReading {
    /// Reported position.
    pub position: Vec3,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

/// A reported rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationReading {
    /// Yaw in degrees.
    pub yaw: f64,
    /// Pitch in degrees.
    pub pitch: f64,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl RotationReading {
    fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite()
    }
}

/// Grounded state as claimed and as observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroundClaim {
    /// What the client says.
    pub claimed_on_ground: bool,
    /// What the server world says.
    pub server_on_ground: bool,
}

/// Movement validator.
pub struct MovementValidator {
    store: Arc<TelemetryStore>,
}

impl MovementValidator {
    /// Creates a validator writing into `store`.
    #[must_use]
    pub fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store }
    }

    /// Scores a reported position against the previous one.
    pub fn check_position_spoof(
        &self,
        entity: EntityId,
        current: PositionReading,
        previous: PositionReading,
    ) -> f64 {
        if !current.position.is_finite() || !previous.position.is_finite() {
            tracing::warn!("Non-finite position from {}", entity);
            return MALFORMED_SAMPLE_SCORE;
        }

        let distance = current.position.distance(previous.position);
        let score = self.store.with_profile(entity, |profile| {
            profile.positions.push(PositionSample {
                position: current.position,
                distance_from_prev: distance,
                timestamp_ms: current.timestamp_ms,
            });

            let mut score = 0.0;
            if distance > TELEPORT_DISTANCE {
                score += TELEPORT_PENALTY;
            }
            if distance == 0.0 && is_moving(profile) {
                score += FROZEN_POSITION_PENALTY;
            }
            if has_erratic_steps(profile) {
                score += OUTLIER_PENALTY;
            }
            score
        });

        finish(entity, "position", score)
    }

    /// Scores a reported rotation against the previous one.
    pub fn check_rotation_spoof(
        &self,
        entity: EntityId,
        current: RotationReading,
        previous: RotationReading,
    ) -> f64 {
        if !current.is_finite() || !previous.is_finite() {
            tracing::warn!("Non-finite rotation from {}", entity);
            return MALFORMED_SAMPLE_SCORE;
        }

        let raw_yaw_delta = current.yaw - previous.yaw;
        let sample = RotationSample {
            yaw: current.yaw,
            pitch: current.pitch,
            yaw_delta: normalize_yaw(raw_yaw_delta),
            pitch_delta: (current.pitch - previous.pitch).abs(),
            timestamp_ms: current.timestamp_ms,
        };

        let score = self.store.with_profile(entity, |profile| {
            profile.rotations.push(sample);

            let mut score = 0.0;
            if raw_yaw_delta.abs() > MAX_RAW_YAW_DELTA {
                score += IMPOSSIBLE_TURN_PENALTY;
            }
            if sample.is_frozen() && is_moving(profile) {
                score += FROZEN_ROTATION_PENALTY;
            }

            let history = &profile.rotations;
            if history.len() >= AIM_LOCK_WINDOW {
                let frozen = history.last_n(AIM_LOCK_WINDOW).filter(|r| r.is_frozen()).count();
                #[allow(clippy::cast_precision_loss)]
                let ratio = frozen as f64 / AIM_LOCK_WINDOW as f64;
                if ratio >= AIM_LOCK_RATIO {
                    score += AIM_LOCK_PENALTY;
                }
            }
            if history.len() >= SNAP_WINDOW
                && history.last_n(SNAP_WINDOW).any(|r| r.yaw_delta.abs() > SNAP_YAW_DELTA)
            {
                score += SNAP_PENALTY;
            }
            score
        });

        finish(entity, "rotation", score)
    }

    /// Scores a reported velocity against the previous one.
    pub fn check_velocity_spoof(
        &self,
        entity: EntityId,
        current: Vec3,
        previous: Vec3,
        on_ground: bool,
    ) -> f64 {
        if !current.is_finite() || !previous.is_finite() {
            tracing::warn!("Non-finite velocity from {}", entity);
            return MALFORMED_SAMPLE_SCORE;
        }

        let score = self.store.with_profile(entity, |profile| {
            profile.velocities.push(current);

            let mut score = 0.0;
            if on_ground && current.horizontal_length() > MAX_GROUND_SPEED {
                score += GROUND_SPEED_PENALTY;
            }
            if (current.length() - previous.length()).abs() > MAX_SPEED_CHANGE {
                score += SPEED_CHANGE_PENALTY;
            }
            let history = &profile.velocities;
            if history.len() >= CEILING_WINDOW
                && history.last_n(CEILING_WINDOW).any(|v| v.length() > VELOCITY_CEILING)
            {
                score += CEILING_PENALTY;
            }
            score
        });

        finish(entity, "velocity", score)
    }

    /// Scores a grounded claim against the server's view.
    pub fn check_ground_spoof(&self, entity: EntityId, claim: GroundClaim) -> f64 {
        let score = self.store.with_profile(entity, |profile| {
            let mut score = 0.0;
            if claim.claimed_on_ground && !claim.server_on_ground {
                profile.bump_ground_spoof();
                score += GROUND_SPOOF_PENALTY;
            }
            if profile.ground_spoof_count() > REPEAT_OFFENDER_COUNT {
                score += REPEAT_OFFENDER_PENALTY;
            }
            score
        });

        finish(entity, "ground", score)
    }
}

/// True if the newest recorded velocity is above the idle epsilon.
fn is_moving(profile: &EntityProfile) -> bool {
    profile
        .last_velocity()
        .is_some_and(|v| v.length() > IDLE_VELOCITY_EPSILON)
}

/// True if too many of the recent step distances stray from their mean.
///
/// A step is an outlier when its deviation from the window mean exceeds
/// the mean itself.
fn has_erratic_steps(profile: &EntityProfile) -> bool {
    if profile.positions.len() < OUTLIER_WINDOW {
        return false;
    }
    let steps: Vec<f64> = profile
        .positions
        .last_n(OUTLIER_WINDOW)
        .map(|p| p.distance_from_prev)
        .collect();
    let Some(mean) = warden_core::stats::mean(&steps) else {
        return false;
    };
    let outliers = warden_core::stats::fraction_where(&steps, |d| (d - mean).abs() > mean);
    outliers > OUTLIER_RATIO
}

fn finish(entity: EntityId, check: &str, score: f64) -> f64 {
    let score = score.clamp(0.0, MAX_SUSPICION);
    if score > 0.0 {
        tracing::debug!("{} {} check scored {:.1}", entity, check, score);
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: EntityId = EntityId(1);

    fn validator() -> (MovementValidator, Arc<TelemetryStore>) {
        let store = Arc::new(TelemetryStore::new());
        (MovementValidator::new(Arc::clone(&store)), store)
    }

    fn at(x: f64) -> PositionReading {
        PositionReading { position: Vec3::new(x, 64.0, 0.0), timestamp_ms: 0 }
    }

    fn rot(yaw: f64, pitch: f64) -> RotationReading {
        RotationReading { yaw, pitch, timestamp_ms: 0 }
    }

    #[test]
    fn test_teleport_flagged() {
        let (v, _) = validator();
        assert_eq!(v.check_position_spoof(E, at(0.2), at(0.0)), 0.0);
        assert_eq!(v.check_position_spoof(E, at(100.0), at(0.2)), 50.0);
    }

    #[test]
    fn test_frozen_position_only_when_moving() {
        let (v, store) = validator();
        assert_eq!(v.check_position_spoof(E, at(5.0), at(5.0)), 0.0);

        store.record_velocity(E, Vec3::new(0.3, 0.0, 0.0));
        assert_eq!(v.check_position_spoof(E, at(5.0), at(5.0)), 20.0);
    }

    #[test]
    fn test_erratic_steps() {
        let (v, _) = validator();
        // Four small steps, then one large one: a single outlier in five.
        let steps = [0.2, 0.2, 0.2, 0.2, 8.0];
        let mut x = 0.0;
        let mut last = 0.0;
        for step in steps {
            x += step;
            last = v.check_position_spoof(E, at(x), at(x - step));
        }
        // mean = 1.76; only the 8.0 step deviates by more than the mean.
        assert_eq!(last, 0.0);

        x += 9.0;
        let score = v.check_position_spoof(E, at(x), at(x - 9.0));
        // Window [0.2, 0.2, 0.2, 8.0, 9.0]: mean 3.52, two outliers = 40%.
        assert_eq!(score, 30.0);
    }

    #[test]
    fn test_impossible_turn_and_snap() {
        let (v, _) = validator();
        for _ in 0..4 {
            v.check_rotation_spoof(E, rot(10.0, 0.0), rot(0.0, 0.0));
        }
        // Raw 190 normalizes to -170: impossible turn plus snap.
        assert_eq!(v.check_rotation_spoof(E, rot(190.0, 0.0), rot(0.0, 0.0)), 65.0);
    }

    #[test]
    fn test_aim_lock_after_window_fills() {
        let (v, store) = validator();
        store.record_velocity(E, Vec3::new(0.2, 0.0, 0.0));

        let mut scores = Vec::new();
        for _ in 0..10 {
            scores.push(v.check_rotation_spoof(E, rot(45.0, 10.0), rot(45.0, 10.0)));
        }
        assert!(scores[..9].iter().all(|&s| s == 15.0));
        assert_eq!(scores[9], 50.0);
    }

    #[test]
    fn test_velocity_checks() {
        let (v, _) = validator();
        let walk = Vec3::new(0.2, 0.0, 0.0);

        assert_eq!(v.check_velocity_spoof(E, walk, walk, true), 0.0);
        // Fast on the ground plus an abrupt change.
        assert_eq!(v.check_velocity_spoof(E, Vec3::new(1.5, 0.0, 0.0), walk, true), 40.0);
        // Third sample breaks the ceiling: everything fires.
        let score = v.check_velocity_spoof(E, Vec3::new(3.0, 0.0, 0.0), Vec3::new(1.5, 0.0, 0.0), true);
        assert_eq!(score, 90.0);
    }

    #[test]
    fn test_ground_spoof_escalates() {
        let (v, _) = validator();
        let spoof = GroundClaim { claimed_on_ground: true, server_on_ground: false };

        for _ in 0..5 {
            assert_eq!(v.check_ground_spoof(E, spoof), 30.0);
        }
        assert_eq!(v.check_ground_spoof(E, spoof), 50.0);
        // Escalation does not decay.
        assert_eq!(v.check_ground_spoof(E, GroundClaim::default()), 20.0);
    }

    #[test]
    fn test_non_finite_rejected_without_recording() {
        let (v, store) = validator();
        let bad = PositionReading { position: Vec3::new(f64::NAN, 0.0, 0.0), timestamp_ms: 0 };
        assert_eq!(v.check_position_spoof(E, bad, at(0.0)), 100.0);
        assert!(store.positions(E).is_empty());
    }
}
