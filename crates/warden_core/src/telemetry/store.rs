//! # Telemetry Store
//!
//! Concurrent map from entity to its bounded history.
//!
//! ## Locking
//!
//! ```text
//!   DashMap shard lock (held only to find or insert the Arc)
//!         │
//!         ▼
//!   Arc<Mutex<EntityProfile>>  (held for one record or one check)
//! ```
//!
//! The shard lock is released before the profile lock is taken, so a slow
//! check on one entity never blocks lookups of another. Eviction only
//! removes the map entry: a detector already holding the `Arc` finishes
//! against a detached profile, and the next lookup sees "no data".

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use warden_shared::{EntityId, Vec3, HISTORY_CAPACITY};

use super::profile::EntityProfile;
use super::samples::{
    BufferKind, PatternSample, PatternType, PositionSample, RotationSample, SeriesKind, Snapshot,
};

/// Shared handle to one entity's profile.
pub type ProfileHandle = Arc<Mutex<EntityProfile>>;

/// Bounded per-entity telemetry history.
pub struct TelemetryStore {
    /// Per-entity profiles.
    profiles: DashMap<EntityId, ProfileHandle>,
    /// Capacity of every buffer in every profile.
    capacity: usize,
}

impl TelemetryStore {
    /// Creates a store with the default history capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Creates a store whose buffers hold `capacity` samples each.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            profiles: DashMap::new(),
            capacity,
        }
    }

    /// Buffer capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True if no entity is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// True if the entity has a profile.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.profiles.contains_key(&entity)
    }

    /// Returns the entity's profile, creating it on first use.
    #[must_use]
    pub fn profile(&self, entity: EntityId) -> ProfileHandle {
        if let Some(existing) = self.profiles.get(&entity) {
            return Arc::clone(existing.value());
        }
        let capacity = self.capacity;
        let handle = self
            .profiles
            .entry(entity)
            .or_insert_with(|| Arc::new(Mutex::new(EntityProfile::new(capacity))));
        Arc::clone(handle.value())
    }

    /// Returns the entity's profile without creating one.
    #[must_use]
    pub fn existing(&self, entity: EntityId) -> Option<ProfileHandle> {
        self.profiles.get(&entity).map(|entry| Arc::clone(entry.value()))
    }

    /// Runs `f` with exclusive access to the entity's profile.
    ///
    /// Creates the profile on first use and marks it as seen. Samples for one
    /// entity are applied in the order callers acquire this lock.
    pub fn with_profile<R>(&self, entity: EntityId, f: impl FnOnce(&mut EntityProfile) -> R) -> R {
        let handle = self.profile(entity);
        let mut profile = handle.lock();
        profile.touch();
        f(&mut profile)
    }

    /// Runs `f` against an existing profile. `None` if the entity is unknown.
    pub fn read_profile<R>(&self, entity: EntityId, f: impl FnOnce(&EntityProfile) -> R) -> Option<R> {
        let handle = self.existing(entity)?;
        let profile = handle.lock();
        Some(f(&profile))
    }

    // =========================================================================
    // RECORDING
    // =========================================================================

    /// Appends a position sample.
    pub fn record_position(&self, entity: EntityId, sample: PositionSample) {
        self.with_profile(entity, |p| {
            p.positions.push(sample);
        });
    }

    /// Appends a rotation sample.
    pub fn record_rotation(&self, entity: EntityId, sample: RotationSample) {
        self.with_profile(entity, |p| {
            p.rotations.push(sample);
        });
    }

    /// Appends a velocity sample.
    pub fn record_velocity(&self, entity: EntityId, velocity: Vec3) {
        self.with_profile(entity, |p| {
            p.velocities.push(velocity);
        });
    }

    /// Appends a pattern submission.
    pub fn record_pattern(&self, entity: EntityId, sample: PatternSample) {
        self.with_profile(entity, |p| p.push_pattern(sample));
    }

    /// Appends a scalar observation.
    pub fn record_series(&self, entity: EntityId, kind: SeriesKind, value: f64) {
        self.with_profile(entity, |p| p.push_series(kind, value));
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Point-in-time copy of one buffer, oldest first.
    ///
    /// Unknown entities yield an empty snapshot of the requested kind.
    #[must_use]
    pub fn snapshot(&self, entity: EntityId, kind: BufferKind) -> Snapshot {
        let copy = self.read_profile(entity, |p| match kind {
            BufferKind::Position => Snapshot::Positions(p.positions.to_vec()),
            BufferKind::Rotation => Snapshot::Rotations(p.rotations.to_vec()),
            BufferKind::Velocity => Snapshot::Velocities(p.velocities.to_vec()),
            BufferKind::Pattern(pattern) => {
                Snapshot::Patterns(p.patterns(pattern).map(|b| b.to_vec()).unwrap_or_default())
            }
            BufferKind::Series(series) => {
                Snapshot::Series(p.series(series).map(|b| b.to_vec()).unwrap_or_default())
            }
        });
        copy.unwrap_or_else(|| empty_snapshot(kind))
    }

    /// Copy of the position history.
    #[must_use]
    pub fn positions(&self, entity: EntityId) -> Vec<PositionSample> {
        self.read_profile(entity, |p| p.positions.to_vec()).unwrap_or_default()
    }

    /// Copy of the rotation history.
    #[must_use]
    pub fn rotations(&self, entity: EntityId) -> Vec<RotationSample> {
        self.read_profile(entity, |p| p.rotations.to_vec()).unwrap_or_default()
    }

    /// Copy of the velocity history.
    #[must_use]
    pub fn velocities(&self, entity: EntityId) -> Vec<Vec3> {
        self.read_profile(entity, |p| p.velocities.to_vec()).unwrap_or_default()
    }

    /// Copy of a scalar series.
    #[must_use]
    pub fn series(&self, entity: EntityId, kind: SeriesKind) -> Vec<f64> {
        self.read_profile(entity, |p| p.series(kind).map(|b| b.to_vec()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Copy of the pattern submissions for one detector.
    #[must_use]
    pub fn patterns(&self, entity: EntityId, pattern: PatternType) -> Vec<PatternSample> {
        self.read_profile(entity, |p| p.patterns(pattern).map(|b| b.to_vec()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Newest recorded velocity.
    #[must_use]
    pub fn last_velocity(&self, entity: EntityId) -> Option<Vec3> {
        self.read_profile(entity, EntityProfile::last_velocity).flatten()
    }

    // =========================================================================
    // EVICTION
    // =========================================================================

    /// Removes every buffer of the entity.
    ///
    /// Idempotent: returns `false` if there was nothing to remove.
    pub fn evict(&self, entity: EntityId) -> bool {
        let removed = self.profiles.remove(&entity).is_some();
        if removed {
            tracing::debug!("Evicted telemetry for {}", entity);
        }
        removed
    }

    /// Evicts every profile not written for longer than `max_idle`.
    ///
    /// Returns the evicted entities.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<EntityId> {
        let mut evicted = Vec::new();
        self.profiles.retain(|entity, handle| {
            // A profile busy in a check is, by definition, not idle.
            let idle = handle
                .try_lock()
                .is_some_and(|profile| profile.last_seen().elapsed() > max_idle);
            if idle {
                evicted.push(*entity);
            }
            !idle
        });
        if !evicted.is_empty() {
            tracing::info!("Evicted {} idle telemetry profiles", evicted.len());
        }
        evicted
    }
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_snapshot(kind: BufferKind) -> Snapshot {
    match kind {
        BufferKind::Position => Snapshot::Positions(Vec::new()),
        BufferKind::Rotation => Snapshot::Rotations(Vec::new()),
        BufferKind::Velocity => Snapshot::Velocities(Vec::new()),
        BufferKind::Pattern(_) => Snapshot::Patterns(Vec::new()),
        BufferKind::Series(_) => Snapshot::Series(Vec::new()),
    }
}
