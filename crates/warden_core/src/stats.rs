//! # Window Statistics
//!
//! Summary statistics over short sample windows.
//!
//! Variance uses Welford's online update. Detectors compare standard
//! deviations below 0.01 on values that may sit on a large baseline.

#![allow(clippy::cast_precision_loss)]

/// Welford accumulator for mean and population variance.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0, mean: 0.0, m2: 0.0 }
    }

    /// Builds an accumulator over a slice.
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Self {
        let mut stats = Self::new();
        for &v in values {
            stats.push(v);
        }
        stats
    }

    /// Adds one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        let n = self.count as f64;
        self.mean += delta / n;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of observations.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean, or `None` when empty.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population variance, or `None` when empty.
    #[must_use]
    pub fn population_variance(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).max(0.0))
    }

    /// Population standard deviation, or `None` when empty.
    #[must_use]
    pub fn population_std_dev(&self) -> Option<f64> {
        self.population_variance().map(f64::sqrt)
    }
}

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    RunningStats::from_slice(values).mean()
}

/// Population standard deviation.
#[must_use]
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    RunningStats::from_slice(values).population_std_dev()
}

/// Standard deviation divided by the absolute mean.
///
/// `None` when empty or when the mean is zero.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let stats = RunningStats::from_slice(values);
    let mean = stats.mean()?;
    if mean == 0.0 {
        return None;
    }
    Some(stats.population_std_dev()? / mean.abs())
}

/// Mean of `|v[i+1] - v[i]|`. `None` with fewer than two values.
#[must_use]
pub fn mean_abs_first_difference(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    mean(&diffs)
}

/// Number of distinct values, compared exactly (`-0.0 == 0.0`).
#[must_use]
pub fn distinct_count(values: &[f64]) -> usize {
    let mut bits: Vec<u64> = values
        .iter()
        .map(|&v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
        .collect();
    bits.sort_unstable();
    bits.dedup();
    bits.len()
}

/// Fraction of values satisfying `predicate`. Zero when empty.
#[must_use]
pub fn fraction_where(values: &[f64], predicate: impl Fn(f64) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|&&v| predicate(v)).count();
    hits as f64 / values.len() as f64
}
