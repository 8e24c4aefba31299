//! Host environment queries.
//!
//! The detection core never reaches into the host's internals. The host
//! implements [`EnvironmentProbe`] and hands it to the engine instead.

use serde::{Deserialize, Serialize};

use crate::constants::NOMINAL_TPS;

/// Point-in-time view of server health.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Measured ticks per second.
    pub tps: f64,
    /// Memory in use, as a percentage of the host's budget.
    pub memory_pct: f64,
    /// Entities currently online.
    pub online_count: usize,
}

impl EnvironmentSnapshot {
    /// Fraction of nominal tick rate the server is achieving, in `[0, 1]`.
    #[must_use]
    pub fn tick_health(&self) -> f64 {
        if !self.tps.is_finite() {
            return 1.0;
        }
        (self.tps / NOMINAL_TPS).clamp(0.0, 1.0)
    }
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            tps: NOMINAL_TPS,
            memory_pct: 0.0,
            online_count: 0,
        }
    }
}

/// Implemented by the host to report its current health.
pub trait EnvironmentProbe: Send + Sync {
    /// Returns the current environment snapshot.
    fn snapshot(&self) -> EnvironmentSnapshot;
}

/// Probe that always reports the same snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticEnvironment(pub EnvironmentSnapshot);

impl EnvironmentProbe for StaticEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_health_clamped() {
        let lagging = EnvironmentSnapshot { tps: 10.0, ..Default::default() };
        assert_eq!(lagging.tick_health(), 0.5);

        let fast = EnvironmentSnapshot { tps: 25.0, ..Default::default() };
        assert_eq!(fast.tick_health(), 1.0);

        assert_eq!(StaticEnvironment::default().snapshot().tick_health(), 1.0);
    }
}
