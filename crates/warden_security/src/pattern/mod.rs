//! # Pattern Recognition
//!
//! Named statistical detectors for inhumanly regular input.
//!
//! Every detector works on the window of values it is handed. Windows
//! shorter than the detector's minimum score 0: not enough data is a
//! policy result, never an error.
//!
//! | Pattern              | Min | Signal                                 |
//! |----------------------|-----|----------------------------------------|
//! | `PERFECT_TIMING`     | 10  | distinct interval count                |
//! | `LINEAR_AIM`         | 5   | mean absolute first difference         |
//! | `CONSTANT_SPEED`     | 10  | population standard deviation          |
//! | `ZERO_JITTER`        | 5   | fraction of exact zeros                |
//! | `INSTANT_REACTION`   | 5   | fraction of reactions under 50ms       |
//! | `PERFECT_PREDICTION` | 5   | fraction of near-identical neighbours  |

use std::sync::Arc;

use warden_core::stats;
use warden_core::{PatternSample, PatternType, TelemetryStore};
use warden_shared::constants::MAX_SUSPICION;
use warden_shared::EntityId;

/// Reaction time below which no human responds (ms).
pub const HUMAN_REACTION_FLOOR_MS: f64 = 50.0;

/// Neighbour difference below which two predictions count as identical.
const PREDICTION_EPSILON: f64 = 0.01;

/// Pattern engine.
pub struct PatternEngine {
    store: Arc<TelemetryStore>,
}

impl PatternEngine {
    /// Creates an engine recording into `store`.
    #[must_use]
    pub fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store }
    }

    /// Records `values` for `entity` and scores them with the detector
    /// for `pattern`.
    pub fn match_pattern(
        &self,
        entity: EntityId,
        pattern: PatternType,
        values: &[f64],
        timestamp_ms: u64,
    ) -> f64 {
        self.store.record_pattern(
            entity,
            PatternSample { pattern, values: values.to_vec(), timestamp_ms },
        );

        let score = score(pattern, values);
        if score > 0.0 {
            tracing::debug!("{} matched {} ({:.0})", entity, pattern.name(), score);
        }
        score
    }
}

/// Scores `values` with the detector for `pattern`, without recording.
#[must_use]
pub fn score(pattern: PatternType, values: &[f64]) -> f64 {
    let raw = match pattern {
        PatternType::PerfectTiming => perfect_timing(values),
        PatternType::LinearAim => linear_aim(values),
        PatternType::ConstantSpeed => constant_speed(values),
        PatternType::ZeroJitter => zero_jitter(values),
        PatternType::InstantReaction => instant_reaction(values),
        PatternType::PerfectPrediction => perfect_prediction(values),
    };
    raw.clamp(0.0, MAX_SUSPICION)
}

/// Minimum window length the detector for `pattern` needs.
#[must_use]
pub const fn min_samples(pattern: PatternType) -> usize {
    match pattern {
        PatternType::PerfectTiming | PatternType::ConstantSpeed => 10,
        PatternType::LinearAim
        | PatternType::ZeroJitter
        | PatternType::InstantReaction
        | PatternType::PerfectPrediction => 5,
    }
}

fn perfect_timing(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::PerfectTiming) {
        return 0.0;
    }
    match stats::distinct_count(values) {
        1 => 95.0,
        2 => 70.0,
        _ => 0.0,
    }
}

fn linear_aim(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::LinearAim) {
        return 0.0;
    }
    match stats::mean_abs_first_difference(values) {
        Some(d) if d < 0.1 => 85.0,
        Some(d) if d < 0.5 => 60.0,
        _ => 0.0,
    }
}

fn constant_speed(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::ConstantSpeed) {
        return 0.0;
    }
    match stats::population_std_dev(values) {
        Some(sd) if sd < 0.01 => 90.0,
        Some(sd) if sd < 0.05 => 70.0,
        _ => 0.0,
    }
}

fn zero_jitter(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::ZeroJitter) {
        return 0.0;
    }
    let zeros = stats::fraction_where(values, |v| v == 0.0);
    if zeros > 0.8 {
        88.0
    } else if zeros > 0.5 {
        65.0
    } else {
        0.0
    }
}

fn instant_reaction(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::InstantReaction) {
        return 0.0;
    }
    let instant = stats::fraction_where(values, |v| v < HUMAN_REACTION_FLOOR_MS);
    if instant > 0.7 {
        92.0
    } else if instant > 0.5 {
        75.0
    } else {
        0.0
    }
}

fn perfect_prediction(values: &[f64]) -> f64 {
    if values.len() < min_samples(PatternType::PerfectPrediction) {
        return 0.0;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    if diffs.len() < 4 {
        return 0.0;
    }
    let exact = stats::fraction_where(&diffs, |d| d < PREDICTION_EPSILON);
    if exact > 0.9 {
        94.0
    } else if exact > 0.7 {
        80.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_timing_identical_intervals() {
        let engine = PatternEngine::new(Arc::new(TelemetryStore::new()));
        let values = [100.0; 10];
        assert_eq!(engine.match_pattern(EntityId(1), PatternType::PerfectTiming, &values, 0), 95.0);
    }

    #[test]
    fn test_perfect_timing_tiers() {
        let two = [100.0, 120.0, 100.0, 120.0, 100.0, 120.0, 100.0, 120.0, 100.0, 120.0];
        assert_eq!(score(PatternType::PerfectTiming, &two), 70.0);

        let human: Vec<f64> = (0..10).map(|i| 100.0 + f64::from(i) * 7.0).collect();
        assert_eq!(score(PatternType::PerfectTiming, &human), 0.0);

        assert_eq!(score(PatternType::PerfectTiming, &[100.0; 9]), 0.0);
    }

    #[test]
    fn test_linear_aim() {
        assert_eq!(score(PatternType::LinearAim, &[1.0, 1.05, 1.1, 1.15, 1.2]), 85.0);
        assert_eq!(score(PatternType::LinearAim, &[1.0, 1.3, 1.6, 1.9, 2.2]), 60.0);
        assert_eq!(score(PatternType::LinearAim, &[1.0, 5.0, 2.0, 9.0, 3.0]), 0.0);
    }

    #[test]
    fn test_constant_speed() {
        assert_eq!(score(PatternType::ConstantSpeed, &[0.28; 10]), 90.0);
        let loose = [0.25, 0.31, 0.25, 0.31, 0.25, 0.31, 0.25, 0.31, 0.25, 0.31];
        assert_eq!(score(PatternType::ConstantSpeed, &loose), 70.0);
    }

    #[test]
    fn test_zero_jitter() {
        assert_eq!(score(PatternType::ZeroJitter, &[0.0, 0.0, 0.0, 0.0, 0.0]), 88.0);
        assert_eq!(score(PatternType::ZeroJitter, &[0.0, 0.0, 0.0, 0.4, 0.2]), 65.0);
        assert_eq!(score(PatternType::ZeroJitter, &[0.0, 0.3, 0.1, 0.4, 0.2]), 0.0);
    }

    #[test]
    fn test_instant_reaction() {
        assert_eq!(score(PatternType::InstantReaction, &[10.0, 20.0, 30.0, 40.0, 45.0]), 92.0);
        assert_eq!(score(PatternType::InstantReaction, &[10.0, 20.0, 30.0, 240.0, 300.0]), 75.0);
        assert_eq!(score(PatternType::InstantReaction, &[180.0, 220.0, 30.0, 240.0, 300.0]), 0.0);
    }

    #[test]
    fn test_perfect_prediction() {
        assert_eq!(score(PatternType::PerfectPrediction, &[3.0; 5]), 94.0);
        // 4 of 5 neighbour pairs identical = 80%.
        assert_eq!(score(PatternType::PerfectPrediction, &[3.0, 3.0, 3.0, 3.0, 3.0, 4.0]), 80.0);
        assert_eq!(score(PatternType::PerfectPrediction, &[3.0; 4]), 0.0);
    }

    #[test]
    fn test_match_records_submission() {
        let store = Arc::new(TelemetryStore::new());
        let engine = PatternEngine::new(Arc::clone(&store));
        engine.match_pattern(EntityId(7), PatternType::ZeroJitter, &[0.0, 1.0], 42);

        let recorded = store.patterns(EntityId(7), PatternType::ZeroJitter);
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].values, vec![0.0, 1.0]);
        assert_eq!(recorded[0].timestamp_ms, 42);
    }
}
