//! Per-entity telemetry profile.

use std::collections::HashMap;
use std::time::Instant;

use warden_shared::Vec3;

use super::samples::{PatternSample, PatternType, PositionSample, RotationSample, SeriesKind};
use crate::memory::RingBuffer;

/// Everything recorded about one entity.
///
/// Owned by the [`TelemetryStore`](super::TelemetryStore) behind a
/// per-entity lock. Detectors borrow it for the duration of one check.
#[derive(Debug)]
pub struct EntityProfile {
    capacity: usize,
    /// Position history.
    pub positions: RingBuffer<PositionSample>,
    /// Rotation history.
    pub rotations: RingBuffer<RotationSample>,
    /// Velocity history.
    pub velocities: RingBuffer<Vec3>,
    patterns: HashMap<PatternType, RingBuffer<PatternSample>>,
    series: HashMap<SeriesKind, RingBuffer<f64>>,
    ground_spoof_count: u64,
    last_click_ms: Option<u64>,
    last_hit_ms: Option<u64>,
    last_seen: Instant,
}

impl EntityProfile {
    /// Creates an empty profile whose buffers hold `capacity` samples each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            positions: RingBuffer::new(capacity),
            rotations: RingBuffer::new(capacity),
            velocities: RingBuffer::new(capacity),
            patterns: HashMap::new(),
            series: HashMap::new(),
            ground_spoof_count: 0,
            last_click_ms: None,
            last_hit_ms: None,
            last_seen: Instant::now(),
        }
    }

    /// Capacity shared by every buffer of this profile.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends a pattern submission.
    pub fn push_pattern(&mut self, sample: PatternSample) {
        let capacity = self.capacity;
        self.patterns
            .entry(sample.pattern)
            .or_insert_with(|| RingBuffer::new(capacity))
            .push(sample);
    }

    /// Pattern buffer for one detector, if anything was submitted.
    #[must_use]
    pub fn patterns(&self, pattern: PatternType) -> Option<&RingBuffer<PatternSample>> {
        self.patterns.get(&pattern)
    }

    /// Appends a scalar observation.
    pub fn push_series(&mut self, kind: SeriesKind, value: f64) {
        let capacity = self.capacity;
        self.series
            .entry(kind)
            .or_insert_with(|| RingBuffer::new(capacity))
            .push(value);
    }

    /// Scalar series, if anything was recorded.
    #[must_use]
    pub fn series(&self, kind: SeriesKind) -> Option<&RingBuffer<f64>> {
        self.series.get(&kind)
    }

    /// Records a click and returns the interval since the previous one.
    pub fn record_click(&mut self, timestamp_ms: u64) -> Option<f64> {
        let interval = interval_since(&mut self.last_click_ms, timestamp_ms)?;
        self.push_series(SeriesKind::ClickIntervals, interval);
        Some(interval)
    }

    /// Records a combat hit and returns the interval since the previous one.
    pub fn record_hit(&mut self, timestamp_ms: u64) -> Option<f64> {
        let interval = interval_since(&mut self.last_hit_ms, timestamp_ms)?;
        self.push_series(SeriesKind::HitIntervals, interval);
        Some(interval)
    }

    /// Newest recorded velocity.
    #[must_use]
    pub fn last_velocity(&self) -> Option<Vec3> {
        self.velocities.newest().copied()
    }

    /// Increments the ground-spoof counter and returns the new value.
    pub fn bump_ground_spoof(&mut self) -> u64 {
        self.ground_spoof_count += 1;
        self.ground_spoof_count
    }

    /// Times the entity claimed ground it was not standing on.
    #[must_use]
    pub const fn ground_spoof_count(&self) -> u64 {
        self.ground_spoof_count
    }

    /// Marks the profile as seen now.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// When the profile was last written.
    #[must_use]
    pub const fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// Updates `last` and returns the elapsed interval.
///
/// Out-of-order timestamps saturate to zero instead of going negative.
fn interval_since(last: &mut Option<u64>, timestamp_ms: u64) -> Option<f64> {
    let previous = last.replace(timestamp_ms)?;
    #[allow(clippy::cast_precision_loss)]
    let interval = timestamp_ms.saturating_sub(previous) as f64;
    Some(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::samples::DomainKind;

    #[test]
    fn test_click_intervals() {
        let mut profile = EntityProfile::new(50);

        assert_eq!(profile.record_click(1_000), None);
        assert_eq!(profile.record_click(1_120), Some(120.0));
        assert_eq!(profile.record_click(1_100), Some(0.0));
        assert_eq!(profile.series(SeriesKind::ClickIntervals).unwrap().len(), 2);
        assert!(profile.series(SeriesKind::HitIntervals).is_none());
    }

    #[test]
    fn test_lazy_buffers_are_bounded() {
        let mut profile = EntityProfile::new(5);

        for i in 0..20 {
            profile.push_series(SeriesKind::Domain(DomainKind::Mining), f64::from(i));
            profile.push_pattern(PatternSample {
                pattern: PatternType::ZeroJitter,
                values: vec![0.0],
                timestamp_ms: 0,
            });
        }

        assert_eq!(profile.series(SeriesKind::Domain(DomainKind::Mining)).unwrap().len(), 5);
        assert_eq!(profile.patterns(PatternType::ZeroJitter).unwrap().len(), 5);
    }

    #[test]
    fn test_ground_spoof_counter_monotonic() {
        let mut profile = EntityProfile::new(5);
        assert_eq!(profile.bump_ground_spoof(), 1);
        assert_eq!(profile.bump_ground_spoof(), 2);
        assert_eq!(profile.ground_spoof_count(), 2);
    }
}
