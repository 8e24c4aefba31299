//! # Adaptive Threshold Model
//!
//! One online learner per named check. Each learner keeps a bounded buffer
//! of labeled samples and nudges its decision threshold toward whichever
//! error (false positives or false negatives) dominates that buffer.
//!
//! ## Phases
//!
//! ```text
//! Idle ──train──► Learning (<10 samples) ──train──► Adapting (≥10 samples)
//! ```
//!
//! The threshold is frozen until the model is adapting.

mod registry;

pub use registry::{ModelRegistry, ModelSummary};

use std::collections::VecDeque;

use serde::Serialize;
use warden_shared::constants::{MAX_SUSPICION, TRAINING_CAPACITY};

/// Threshold of a fresh model.
pub const INITIAL_THRESHOLD: f64 = 0.5;
/// Training samples needed before the threshold moves.
pub const MIN_TRAINING_SAMPLES: usize = 10;
/// Threshold step per adapting train call.
pub const THRESHOLD_STEP: f64 = 0.01;

/// Learning phase of a model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ModelPhase {
    /// No training data.
    Idle,
    /// Collecting samples; threshold frozen.
    Learning,
    /// Threshold adapts on every train call.
    Adapting,
}

/// A labeled training sample.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    /// Feature values, nominally in `[0, 1]`.
    pub features: Vec<f64>,
    /// Ground-truth label supplied by the host.
    pub is_cheat: bool,
}

/// Per-check detection model.
#[derive(Debug)]
pub struct DetectionModel {
    threshold: f64,
    training: VecDeque<TrainingSample>,
    correct_predictions: u64,
    total_predictions: u64,
    accuracy: f64,
}

impl Default for DetectionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionModel {
    /// Creates an idle model with the initial threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            threshold: INITIAL_THRESHOLD,
            training: VecDeque::with_capacity(TRAINING_CAPACITY),
            correct_predictions: 0,
            total_predictions: 0,
            accuracy: 0.0,
        }
    }

    /// Suspicion in `[0, 100]` for the given features.
    ///
    /// Also updates the self-referential accuracy: a prediction counts as
    /// correct when its normalized score lies above the current threshold.
    pub fn predict(&mut self, features: &[f64]) -> f64 {
        let score = raw_score(features);

        self.total_predictions += 1;
        if score / MAX_SUSPICION > self.threshold {
            self.correct_predictions += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let accuracy = self.correct_predictions as f64 / self.total_predictions as f64;
        self.accuracy = accuracy;
        score
    }

    /// Adds a labeled sample and, once adapting, moves the threshold.
    pub fn train(&mut self, features: Vec<f64>, is_cheat: bool) {
        if self.training.len() == TRAINING_CAPACITY {
            self.training.pop_front();
        }
        self.training.push_back(TrainingSample { features, is_cheat });

        if self.training.len() >= MIN_TRAINING_SAMPLES {
            self.adapt();
        }
    }

    /// Recomputes error counts over the whole buffer and steps the threshold.
    fn adapt(&mut self) {
        let threshold = self.threshold;
        let (false_positives, false_negatives) =
            self.training.iter().fold((0usize, 0usize), |(fp, fneg), sample| {
                let flagged = raw_score(&sample.features) / MAX_SUSPICION > threshold;
                match (flagged, sample.is_cheat) {
                    (true, false) => (fp + 1, fneg),
                    (false, true) => (fp, fneg + 1),
                    _ => (fp, fneg),
                }
            });

        let next = match false_positives.cmp(&false_negatives) {
            std::cmp::Ordering::Greater => threshold + THRESHOLD_STEP,
            std::cmp::Ordering::Less => threshold - THRESHOLD_STEP,
            std::cmp::Ordering::Equal => threshold,
        };
        self.threshold = next.clamp(0.0, 1.0);
    }

    /// Current decision threshold in `[0, 1]`.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Self-referential accuracy in `[0, 1]`.
    #[must_use]
    pub const fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Predictions made so far.
    #[must_use]
    pub const fn total_predictions(&self) -> u64 {
        self.total_predictions
    }

    /// Buffered training samples.
    #[must_use]
    pub fn training_len(&self) -> usize {
        self.training.len()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ModelPhase {
        match self.training.len() {
            0 => ModelPhase::Idle,
            n if n < MIN_TRAINING_SAMPLES => ModelPhase::Learning,
            _ => ModelPhase::Adapting,
        }
    }
}

/// `clamp(mean(features), 0, 1) * 100`. Non-finite features are skipped;
/// nothing left scores 0. Extreme finite features can overflow the running
/// mean to NaN, which also scores 0.
fn raw_score(features: &[f64]) -> f64 {
    let finite: Vec<f64> = features.iter().copied().filter(|f| f.is_finite()).collect();
    warden_core::stats::mean(&finite)
        .filter(|m| !m.is_nan())
        .map_or(0.0, |m| m.clamp(0.0, 1.0) * MAX_SUSPICION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_scales_mean() {
        let mut model = DetectionModel::new();
        assert_eq!(model.predict(&[]), 0.0);
        assert!((model.predict(&[0.2, 0.4]) - 30.0).abs() < 1e-9);
        assert_eq!(model.predict(&[3.0]), 100.0);
        assert_eq!(model.predict(&[-1.0]), 0.0);
        assert_eq!(model.predict(&[f64::NAN, 0.5]), 50.0);
    }

    #[test]
    fn test_extreme_features_stay_in_range() {
        let mut model = DetectionModel::new();
        let score = model.predict(&[f64::MAX, -f64::MAX, 0.0]);
        assert!((0.0..=MAX_SUSPICION).contains(&score), "scored {score}");
        assert_eq!(model.predict(&[f64::MAX, f64::MAX]), MAX_SUSPICION);
        assert_eq!(model.predict(&[-f64::MAX, -f64::MAX]), 0.0);

        for _ in 0..20 {
            model.train(vec![f64::MAX, -f64::MAX, 0.0], true);
        }
        assert!((0.0..=1.0).contains(&model.threshold()));
    }

    #[test]
    fn test_accuracy_is_self_referential() {
        let mut model = DetectionModel::new();
        model.predict(&[0.9]);
        model.predict(&[0.1]);
        assert!((model.accuracy() - 0.5).abs() < 1e-12);
        assert_eq!(model.total_predictions(), 2);
    }

    #[test]
    fn test_threshold_frozen_while_learning() {
        let mut model = DetectionModel::new();
        assert_eq!(model.phase(), ModelPhase::Idle);
        for _ in 0..9 {
            model.train(vec![1.0], false);
        }
        assert_eq!(model.phase(), ModelPhase::Learning);
        assert_eq!(model.threshold(), INITIAL_THRESHOLD);
    }

    #[test]
    fn test_false_positives_raise_threshold_until_clamped() {
        let mut model = DetectionModel::new();
        for _ in 0..9 {
            model.train(vec![1.0], false);
        }
        for call in 1..=10 {
            model.train(vec![1.0], false);
            let expected = INITIAL_THRESHOLD + THRESHOLD_STEP * f64::from(call);
            assert!((model.threshold() - expected).abs() < 1e-9);
        }
        for _ in 0..100 {
            model.train(vec![1.0], false);
        }
        assert_eq!(model.threshold(), 1.0);
        assert_eq!(model.phase(), ModelPhase::Adapting);
    }

    #[test]
    fn test_false_negatives_lower_threshold() {
        let mut model = DetectionModel::new();
        for _ in 0..10 {
            model.train(vec![0.0], true);
        }
        assert!((model.threshold() - 0.49).abs() < 1e-9);
    }

    #[test]
    fn test_tie_leaves_threshold() {
        let mut model = DetectionModel::new();
        for _ in 0..5 {
            model.train(vec![1.0], false);
            model.train(vec![0.0], true);
        }
        assert_eq!(model.threshold(), INITIAL_THRESHOLD);
    }

    #[test]
    fn test_training_buffer_bounded() {
        let mut model = DetectionModel::new();
        for _ in 0..TRAINING_CAPACITY + 50 {
            model.train(vec![0.5], true);
        }
        assert_eq!(model.training_len(), TRAINING_CAPACITY);
    }
}
