//! Process-wide registry of detection models, one per check name.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{DetectionModel, ModelPhase};
use crate::error::{SecurityError, SecurityResult};

/// Point-in-time view of one model.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ModelSummary {
    /// Check name.
    pub check: String,
    /// Decision threshold.
    pub threshold: f64,
    /// Self-referential accuracy.
    pub accuracy: f64,
    /// Learning phase.
    pub phase: ModelPhase,
}

/// Models keyed by check name.
///
/// Models are created lazily and locked independently, so training one
/// check never blocks predictions on another.
#[derive(Default)]
pub struct ModelRegistry {
    models: DashMap<String, Arc<Mutex<DetectionModel>>>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn model(&self, check: &str) -> Arc<Mutex<DetectionModel>> {
        if let Some(model) = self.models.get(check) {
            return Arc::clone(model.value());
        }
        Arc::clone(self.models.entry(check.to_owned()).or_default().value())
    }

    /// Suspicion in `[0, 100]` from the named check's model.
    pub fn predict_suspicion(&self, check: &str, features: &[f64]) -> f64 {
        self.model(check).lock().predict(features)
    }

    /// Feeds a labeled sample to the named check's model.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an empty check name or
    /// non-finite features.
    pub fn train_model(&self, check: &str, features: Vec<f64>, is_cheat: bool) -> SecurityResult<()> {
        if check.is_empty() {
            return Err(SecurityError::InvalidInput("empty check name".into()));
        }
        if features.iter().any(|f| !f.is_finite()) {
            return Err(SecurityError::InvalidInput(format!(
                "non-finite training features for {check}"
            )));
        }

        let model = self.model(check);
        let mut model = model.lock();
        let before = model.threshold();
        model.train(features, is_cheat);
        if model.threshold() != before {
            tracing::debug!("{} threshold {:.2} -> {:.2}", check, before, model.threshold());
        }
        Ok(())
    }

    /// Threshold of the named model, if it exists.
    #[must_use]
    pub fn threshold(&self, check: &str) -> Option<f64> {
        self.models.get(check).map(|m| m.lock().threshold())
    }

    /// Number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if no model exists yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Summaries of every model, sorted by check name.
    #[must_use]
    pub fn summaries(&self) -> Vec<ModelSummary> {
        let handles: Vec<(String, Arc<Mutex<DetectionModel>>)> = self
            .models
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();

        let mut out: Vec<ModelSummary> = handles
            .into_iter()
            .map(|(check, model)| {
                let model = model.lock();
                ModelSummary {
                    check,
                    threshold: model.threshold(),
                    accuracy: model.accuracy(),
                    phase: model.phase(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.check.cmp(&b.check));
        out
    }
}
