//! # Domain Window Analyzers
//!
//! One analyzer for every gameplay domain. Each domain picks a scoring
//! strategy and feeds a rolling window of scalar observations into it.
//!
//! | Domain         | Observation              | Strategy     |
//! |----------------|--------------------------|--------------|
//! | `Mining`       | block break interval     | uniformity   |
//! | `Fishing`      | catch reaction time      | uniformity   |
//! | `Crafting`     | crafts per minute        | rate ceiling |
//! | `ResourceGain` | resources per minute     | rate ceiling |

use std::sync::Arc;

use warden_core::{stats, DomainKind, SeriesKind, TelemetryStore};
use warden_shared::constants::MAX_SUSPICION;
use warden_shared::EntityId;

use crate::error::{SecurityError, SecurityResult};

/// Observations examined per score.
pub const WINDOW: usize = 20;
/// Observations needed before anything scores.
pub const MIN_OBSERVATIONS: usize = 10;

/// How a domain's window is scored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoringStrategy {
    /// Flags windows that are too regular to be human.
    Uniformity {
        /// Coefficient of variation below which the window is a bot.
        strict_cv: f64,
        /// Coefficient of variation below which the window is suspicious.
        loose_cv: f64,
    },
    /// Flags windows whose mean exceeds a legitimate rate.
    RateCeiling {
        /// Highest legitimate mean.
        ceiling: f64,
    },
}

impl ScoringStrategy {
    /// Default uniformity thresholds.
    pub const UNIFORMITY: Self = Self::Uniformity { strict_cv: 0.05, loose_cv: 0.10 };

    /// Default strategy for `domain`.
    #[must_use]
    pub const fn for_domain(domain: DomainKind) -> Self {
        match domain {
            DomainKind::Mining | DomainKind::Fishing => Self::UNIFORMITY,
            DomainKind::Crafting => Self::RateCeiling { ceiling: 60.0 },
            DomainKind::ResourceGain => Self::RateCeiling { ceiling: 300.0 },
        }
    }

    /// Scores a window. Fewer than [`MIN_OBSERVATIONS`] values score 0.
    #[must_use]
    pub fn score(&self, window: &[f64]) -> f64 {
        if window.len() < MIN_OBSERVATIONS {
            return 0.0;
        }
        let raw = match *self {
            Self::Uniformity { strict_cv, loose_cv } => match stats::coefficient_of_variation(window) {
                Some(cv) if cv < strict_cv => 80.0,
                Some(cv) if cv < loose_cv => 50.0,
                _ => 0.0,
            },
            Self::RateCeiling { ceiling } => match stats::mean(window) {
                Some(mean) if mean > ceiling && ceiling > 0.0 => 50.0 + 50.0 * (mean / ceiling - 1.0),
                _ => 0.0,
            },
        };
        raw.clamp(0.0, MAX_SUSPICION)
    }
}

/// Window analyzer over every [`DomainKind`].
pub struct WindowAnalyzer {
    store: Arc<TelemetryStore>,
    strategies: [ScoringStrategy; DomainKind::ALL.len()],
}

impl WindowAnalyzer {
    /// Creates an analyzer with the default strategy for each domain.
    #[must_use]
    pub fn new(store: Arc<TelemetryStore>) -> Self {
        Self { store, strategies: DomainKind::ALL.map(ScoringStrategy::for_domain) }
    }

    /// Replaces the strategy for one domain.
    #[must_use]
    pub fn with_strategy(mut self, domain: DomainKind, strategy: ScoringStrategy) -> Self {
        self.strategies[domain as usize] = strategy;
        self
    }

    /// Strategy currently used for `domain`.
    #[must_use]
    pub fn strategy(&self, domain: DomainKind) -> ScoringStrategy {
        self.strategies[domain as usize]
    }

    /// Records one observation and scores the domain's recent window.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for a non-finite observation.
    pub fn observe(&self, entity: EntityId, domain: DomainKind, value: f64) -> SecurityResult<f64> {
        if !value.is_finite() {
            return Err(SecurityError::InvalidInput(format!(
                "non-finite {} observation from {entity}",
                domain.name()
            )));
        }

        let strategy = self.strategy(domain);
        let kind = SeriesKind::Domain(domain);
        let score = self.store.with_profile(entity, |profile| {
            profile.push_series(kind, value);
            let window: Vec<f64> = profile
                .series(kind)
                .map(|s| s.last_n(WINDOW).copied().collect())
                .unwrap_or_default();
            strategy.score(&window)
        });

        if score > 0.0 {
            tracing::debug!("{} {} window scored {:.1}", entity, domain.name(), score);
        }
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_mining_flagged() {
        let analyzer = WindowAnalyzer::new(Arc::new(TelemetryStore::new()));
        let mut score = 0.0;
        for i in 0..10 {
            // Break intervals within ±1% of 250ms.
            let jitter = if i % 2 == 0 { 2.0 } else { -2.0 };
            score = analyzer.observe(EntityId(1), DomainKind::Mining, 250.0 + jitter).unwrap();
        }
        assert_eq!(score, 80.0);
    }

    #[test]
    fn test_below_minimum_scores_zero() {
        let analyzer = WindowAnalyzer::new(Arc::new(TelemetryStore::new()));
        for _ in 0..9 {
            assert_eq!(analyzer.observe(EntityId(1), DomainKind::Fishing, 400.0).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_uniformity_tiers() {
        let strategy = ScoringStrategy::UNIFORMITY;
        let human: Vec<f64> = (0..20).map(|i| 200.0 + f64::from(i % 5) * 40.0).collect();
        assert_eq!(strategy.score(&human), 0.0);

        let loose: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 93.0 } else { 107.0 }).collect();
        assert_eq!(strategy.score(&loose), 50.0);
    }

    #[test]
    fn test_rate_ceiling() {
        let strategy = ScoringStrategy::RateCeiling { ceiling: 60.0 };
        assert_eq!(strategy.score(&[60.0; 10]), 0.0);
        assert_eq!(strategy.score(&[90.0; 10]), 75.0);
        assert_eq!(strategy.score(&[600.0; 10]), 100.0);
    }

    #[test]
    fn test_custom_strategy_and_window() {
        let analyzer = WindowAnalyzer::new(Arc::new(TelemetryStore::new()))
            .with_strategy(DomainKind::ResourceGain, ScoringStrategy::RateCeiling { ceiling: 10.0 });
        assert_eq!(
            analyzer.strategy(DomainKind::ResourceGain),
            ScoringStrategy::RateCeiling { ceiling: 10.0 }
        );

        // Thirty early spikes fall out of the 20-sample window.
        for _ in 0..30 {
            analyzer.observe(EntityId(2), DomainKind::ResourceGain, 100.0).unwrap();
        }
        let mut score = 100.0;
        for _ in 0..20 {
            score = analyzer.observe(EntityId(2), DomainKind::ResourceGain, 5.0).unwrap();
        }
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let analyzer = WindowAnalyzer::new(Arc::new(TelemetryStore::new()));
        assert!(analyzer.observe(EntityId(1), DomainKind::Crafting, f64::NAN).is_err());
    }
}
