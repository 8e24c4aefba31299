//! # The Warden Engine
//!
//! Bundles every detector behind one thread-safe handle.
//!
//! ## Event Flow
//!
//! ```text
//! HostEvent ──► ingest ──┬─► movement checks ──► lag leniency ──┐
//!                        ├─► click timing ──────────────────────┤
//!                        ├─► hit timing ────────────────────────┼─► alert? ──► ReputationLedger
//!                        └─► disconnect ──► evict               │
//! observe_domain ────────────► WindowAnalyzer ──────────────────┘
//! ```
//!
//! A score at or above `alert_level` is an alert. Alerts on a registered
//! session become violations against its identity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use warden_core::{DomainKind, PatternType, SeriesKind, TelemetryStore};
use warden_security::analyzer::WINDOW;
use warden_security::physics::{self, EntityState, Medium};
use warden_security::{
    GroundClaim, MaintenanceHandle, MaintenanceStats, MaintenanceWorker, ModelRegistry,
    ModelSummary, MovementValidator, PatternEngine, PositionReading, ReputationLedger,
    RotationReading, SecurityError, SecurityResult, Violation, WardenConfig, WindowAnalyzer,
};
use warden_shared::constants::{HISTORY_CAPACITY, TICK_RATE};
use warden_shared::{
    EntityId, EnvironmentProbe, EnvironmentSnapshot, HostEvent, MovementFlags, StaticEnvironment,
    Vec3,
};

use crate::session::{Frame, SessionTable};

/// Check name of the position sub-score.
pub const POSITION_CHECK: &str = "POSITION_SPOOF";
/// Check name of the rotation sub-score.
pub const ROTATION_CHECK: &str = "ROTATION_SPOOF";
/// Check name of the velocity sub-score.
pub const VELOCITY_CHECK: &str = "VELOCITY_SPOOF";
/// Check name of the ground sub-score.
pub const GROUND_CHECK: &str = "GROUND_SPOOF";

/// Milliseconds per server tick.
const TICK_MS: u64 = 1_000 / TICK_RATE as u64;

/// Scores produced by one movement update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MovementReport {
    /// Position sub-score.
    pub position: f64,
    /// Rotation sub-score.
    pub rotation: f64,
    /// Velocity sub-score.
    pub velocity: f64,
    /// Ground sub-score.
    pub ground: f64,
    /// Horizontal distance covered relative to what physics allows.
    pub displacement_ratio: f64,
    /// Distance between reported and predicted velocity.
    pub prediction_error: f64,
    /// Multiplier applied for server lag, in `[0, 1]`.
    pub lag_factor: f64,
}

impl MovementReport {
    /// Highest sub-score.
    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.position.max(self.rotation).max(self.velocity).max(self.ground)
    }
}

/// Engine-wide counters.
#[derive(Clone, Debug, Serialize)]
pub struct WardenStats {
    /// Sessions with a registered identity.
    pub sessions: usize,
    /// Session entries, anonymous ones included.
    pub live_sessions: usize,
    /// Entities with telemetry.
    pub tracked_entities: usize,
    /// Host events ingested.
    pub events: u64,
    /// Scores at or above the alert level.
    pub alerts: u64,
    /// Violations recorded by this process.
    pub violations: u64,
    /// Identities with a reputation entry.
    pub identities: usize,
    /// Detection models.
    pub models: Vec<ModelSummary>,
    /// Maintenance worker counters.
    pub maintenance: MaintenanceStats,
    /// Host health at the time of the call.
    pub environment: EnvironmentSnapshot,
}

/// The cheat-detection engine.
pub struct Warden {
    config: WardenConfig,
    store: Arc<TelemetryStore>,
    movement: MovementValidator,
    patterns: PatternEngine,
    analyzer: WindowAnalyzer,
    models: ModelRegistry,
    ledger: Arc<ReputationLedger>,
    sessions: Arc<SessionTable>,
    environment: Arc<dyn EnvironmentProbe>,
    host_clock: Arc<AtomicU64>,
    maintenance: Option<MaintenanceWorker>,
    maintenance_handle: MaintenanceHandle,
    events: AtomicU64,
    alerts: AtomicU64,
}

impl Warden {
    /// Opens an engine on a host reporting nominal health.
    ///
    /// # Errors
    ///
    /// See [`Warden::with_environment`].
    pub fn open(config: WardenConfig) -> SecurityResult<Self> {
        Self::with_environment(config, Arc::new(StaticEnvironment::default()))
    }

    /// Opens an engine, loads the reputation table and starts maintenance.
    ///
    /// A tampered or unreadable reputation file is discarded and logged;
    /// every identity then starts from the default reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidConfig`] for an invalid configuration,
    /// [`SecurityError::Persistence`] if the maintenance thread cannot start.
    pub fn with_environment(
        config: WardenConfig,
        environment: Arc<dyn EnvironmentProbe>,
    ) -> SecurityResult<Self> {
        config.validate()?;

        let store = Arc::new(TelemetryStore::with_capacity(HISTORY_CAPACITY));
        let ledger = Arc::new(ReputationLedger::new());
        if let Err(e) = ledger.load_from(&config.data_path) {
            tracing::warn!("Starting with default reputation: {}", e);
        }

        let host_clock = Arc::new(AtomicU64::new(0));
        let sessions = Arc::new(SessionTable::default());
        let idle_sessions = Arc::clone(&sessions);
        let maintenance = MaintenanceWorker::spawn(
            &config,
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&host_clock),
            Box::new(move |entities| {
                let dropped = idle_sessions.release_idle(entities);
                if dropped > 0 {
                    tracing::debug!("Dropped {} idle anonymous sessions", dropped);
                }
            }),
        )?;
        let maintenance_handle = maintenance.handle();

        tracing::info!("Warden started (alert level {:.0})", config.alert_level);

        Ok(Self {
            movement: MovementValidator::new(Arc::clone(&store)),
            patterns: PatternEngine::new(Arc::clone(&store)),
            analyzer: WindowAnalyzer::new(Arc::clone(&store)),
            models: ModelRegistry::new(),
            sessions,
            environment,
            host_clock,
            maintenance: Some(maintenance),
            maintenance_handle,
            events: AtomicU64::new(0),
            alerts: AtomicU64::new(0),
            config,
            store,
            ledger,
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &WardenConfig {
        &self.config
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Binds `entity` to the persistent `identity` used for reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an empty identity.
    pub fn register_session(&self, entity: EntityId, identity: &str) -> SecurityResult<()> {
        if identity.is_empty() {
            return Err(SecurityError::InvalidInput(format!("empty identity for {entity}")));
        }
        if let Some(previous) = self.sessions.register(entity, identity) {
            tracing::debug!("{} rebound from {} to {}", entity, previous, identity);
        }
        Ok(())
    }

    /// Ends the session and drops all telemetry of `entity`.
    ///
    /// Idempotent: returns `false` if nothing was tracked.
    pub fn disconnect(&self, entity: EntityId) -> bool {
        let had_session = self.sessions.remove(entity);
        let had_telemetry = self.store.evict(entity);
        had_session || had_telemetry
    }

    fn identity_of(&self, entity: EntityId) -> SecurityResult<Arc<str>> {
        self.sessions
            .identity(entity)
            .ok_or_else(|| SecurityError::InvalidInput(format!("unknown session {entity}")))
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Routes one host event and returns the highest score it produced.
    pub fn ingest(&self, event: &HostEvent) -> f64 {
        self.events.fetch_add(1, Ordering::Relaxed);
        match *event {
            HostEvent::Movement { entity, position, yaw, pitch, velocity, flags, timestamp_ms } => {
                let frame = Frame { position, yaw, pitch, velocity, flags, timestamp_ms };
                self.process_movement(entity, frame).max_score()
            }
            HostEvent::Click { entity, timestamp_ms } => self.record_click(entity, timestamp_ms),
            HostEvent::CombatHit { entity, timestamp_ms } => self.record_combat_hit(entity, timestamp_ms),
            HostEvent::Disconnect { entity } => {
                self.disconnect(entity);
                0.0
            }
        }
    }

    /// Runs every movement check for a [`HostEvent::Movement`] and returns
    /// the full report. Other events yield `None` and are not processed.
    pub fn ingest_movement(&self, event: &HostEvent) -> Option<MovementReport> {
        let HostEvent::Movement { entity, position, yaw, pitch, velocity, flags, timestamp_ms } = *event
        else {
            return None;
        };
        self.events.fetch_add(1, Ordering::Relaxed);
        let frame = Frame { position, yaw, pitch, velocity, flags, timestamp_ms };
        Some(self.process_movement(entity, frame))
    }

    /// Runs every movement check for one update.
    ///
    /// The first update of an entity only seeds velocity and ground history;
    /// position and rotation need a previous frame.
    fn process_movement(&self, entity: EntityId, frame: Frame) -> MovementReport {
        self.advance_clock(frame.timestamp_ms);
        let lag_factor = self.lag_factor();
        let previous = self.sessions.swap_frame(entity, frame);
        let mut report = MovementReport { lag_factor, ..MovementReport::default() };

        if let Some(prev) = previous {
            report.position = lag_factor
                * self.movement.check_position_spoof(
                    entity,
                    PositionReading { position: frame.position, timestamp_ms: frame.timestamp_ms },
                    PositionReading { position: prev.position, timestamp_ms: prev.timestamp_ms },
                );
            report.rotation = lag_factor
                * self.movement.check_rotation_spoof(
                    entity,
                    RotationReading { yaw: frame.yaw, pitch: frame.pitch, timestamp_ms: frame.timestamp_ms },
                    RotationReading { yaw: prev.yaw, pitch: prev.pitch, timestamp_ms: prev.timestamp_ms },
                );
            (report.displacement_ratio, report.prediction_error) = physics_residuals(&prev, &frame);
        }

        let previous_velocity = previous.map_or(frame.velocity, |p| p.velocity);
        report.velocity = lag_factor
            * self.movement.check_velocity_spoof(
                entity,
                frame.velocity,
                previous_velocity,
                frame.flags.server_on_ground,
            );
        report.ground = lag_factor * self.movement.check_ground_spoof(entity, ground_claim(&frame.flags));

        let details = format!(
            "displacement {:.2}x, prediction error {:.3}, lag factor {:.2}",
            report.displacement_ratio, report.prediction_error, lag_factor
        );
        for (check, score) in [
            (POSITION_CHECK, report.position),
            (ROTATION_CHECK, report.rotation),
            (VELOCITY_CHECK, report.velocity),
            (GROUND_CHECK, report.ground),
        ] {
            self.flag(entity, check, score, frame.timestamp_ms, &details);
        }
        report
    }

    // =========================================================================
    // MOVEMENT CHECKS
    // =========================================================================

    /// Position sub-score, lag-adjusted.
    pub fn check_position_spoof(
        &self,
        entity: EntityId,
        current: PositionReading,
        previous: PositionReading,
    ) -> f64 {
        self.advance_clock(current.timestamp_ms);
        let score = self.lag_factor() * self.movement.check_position_spoof(entity, current, previous);
        self.flag(entity, POSITION_CHECK, score, current.timestamp_ms, "");
        score
    }

    /// Rotation sub-score, lag-adjusted.
    pub fn check_rotation_spoof(
        &self,
        entity: EntityId,
        current: RotationReading,
        previous: RotationReading,
    ) -> f64 {
        self.advance_clock(current.timestamp_ms);
        let score = self.lag_factor() * self.movement.check_rotation_spoof(entity, current, previous);
        self.flag(entity, ROTATION_CHECK, score, current.timestamp_ms, "");
        score
    }

    /// Velocity sub-score, lag-adjusted.
    pub fn check_velocity_spoof(
        &self,
        entity: EntityId,
        current: Vec3,
        previous: Vec3,
        on_ground: bool,
    ) -> f64 {
        let score =
            self.lag_factor() * self.movement.check_velocity_spoof(entity, current, previous, on_ground);
        self.flag(entity, VELOCITY_CHECK, score, self.now_ms(), "");
        score
    }

    /// Ground sub-score, lag-adjusted.
    pub fn check_ground_spoof(&self, entity: EntityId, claim: GroundClaim) -> f64 {
        let score = self.lag_factor() * self.movement.check_ground_spoof(entity, claim);
        self.flag(entity, GROUND_CHECK, score, self.now_ms(), "");
        score
    }

    // =========================================================================
    // PATTERNS & DOMAINS
    // =========================================================================

    /// Scores `values` with the named pattern detector.
    pub fn match_pattern(
        &self,
        entity: EntityId,
        pattern: PatternType,
        values: &[f64],
        timestamp_ms: u64,
    ) -> f64 {
        self.advance_clock(timestamp_ms);
        let score = self.patterns.match_pattern(entity, pattern, values, timestamp_ms);
        self.flag(entity, pattern.name(), score, timestamp_ms, "");
        score
    }

    /// Records a click and runs the perfect-timing detector over the
    /// recent click intervals.
    pub fn record_click(&self, entity: EntityId, timestamp_ms: u64) -> f64 {
        self.advance_clock(timestamp_ms);
        let window = self.store.with_profile(entity, |profile| {
            profile.record_click(timestamp_ms).map(|_| recent(profile, SeriesKind::ClickIntervals))
        });
        window.map_or(0.0, |w| self.match_pattern(entity, PatternType::PerfectTiming, &w, timestamp_ms))
    }

    /// Records a landed hit and runs the instant-reaction detector over the
    /// recent hit intervals.
    pub fn record_combat_hit(&self, entity: EntityId, timestamp_ms: u64) -> f64 {
        self.advance_clock(timestamp_ms);
        let window = self.store.with_profile(entity, |profile| {
            profile.record_hit(timestamp_ms).map(|_| recent(profile, SeriesKind::HitIntervals))
        });
        window.map_or(0.0, |w| self.match_pattern(entity, PatternType::InstantReaction, &w, timestamp_ms))
    }

    /// Records a measured reaction time and runs the instant-reaction
    /// detector over the recent reactions.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for a negative or non-finite reaction.
    pub fn record_combat_reaction(
        &self,
        entity: EntityId,
        reaction_ms: f64,
        timestamp_ms: u64,
    ) -> SecurityResult<f64> {
        if !reaction_ms.is_finite() || reaction_ms < 0.0 {
            return Err(SecurityError::InvalidInput(format!(
                "reaction time {reaction_ms} from {entity}"
            )));
        }
        self.advance_clock(timestamp_ms);
        let window = self.store.with_profile(entity, |profile| {
            profile.push_series(SeriesKind::ReactionTimes, reaction_ms);
            recent(profile, SeriesKind::ReactionTimes)
        });
        Ok(self.match_pattern(entity, PatternType::InstantReaction, &window, timestamp_ms))
    }

    /// Feeds one gameplay-domain observation to its window analyzer.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for a non-finite observation.
    pub fn observe_domain(
        &self,
        entity: EntityId,
        domain: DomainKind,
        value: f64,
        timestamp_ms: u64,
    ) -> SecurityResult<f64> {
        self.advance_clock(timestamp_ms);
        let score = self.analyzer.observe(entity, domain, value)?;
        self.flag(entity, domain.name(), score, timestamp_ms, "");
        Ok(score)
    }

    // =========================================================================
    // MODELS
    // =========================================================================

    /// Suspicion from the named check's adaptive model.
    pub fn predict_suspicion(&self, check: &str, features: &[f64]) -> f64 {
        self.models.predict_suspicion(check, features)
    }

    /// Feeds a labeled sample to the named check's adaptive model.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an empty name or bad features.
    pub fn train_model(&self, check: &str, features: Vec<f64>, is_cheat: bool) -> SecurityResult<()> {
        self.models.train_model(check, features, is_cheat)
    }

    /// Current threshold of the named model.
    #[must_use]
    pub fn model_threshold(&self, check: &str) -> Option<f64> {
        self.models.threshold(check)
    }

    // =========================================================================
    // REPUTATION
    // =========================================================================

    /// Records a violation against the identity bound to `entity` and
    /// returns its new reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an unknown session, an empty
    /// check name or a non-finite severity.
    pub fn record_violation(
        &self,
        entity: EntityId,
        check: &str,
        severity: f64,
        details: &str,
        timestamp_ms: u64,
    ) -> SecurityResult<f64> {
        let identity = self.identity_of(entity)?;
        self.advance_clock(timestamp_ms);
        self.ledger.add_violation(Violation {
            identity: identity.to_string(),
            check_name: check.to_owned(),
            severity,
            timestamp_ms,
            details: details.to_owned(),
        })
    }

    /// Rewards a clean interval for the identity bound to `entity`.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an unknown session.
    pub fn record_clean_interval(&self, entity: EntityId) -> SecurityResult<f64> {
        let identity = self.identity_of(entity)?;
        self.ledger.record_clean_interval(&identity)
    }

    /// Retained violations of the identity bound to `entity`.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an unknown session.
    pub fn violations_for(&self, entity: EntityId) -> SecurityResult<Vec<Violation>> {
        let identity = self.identity_of(entity)?;
        Ok(self.ledger.violations_for(&identity))
    }

    /// Reputation of `identity`.
    #[must_use]
    pub fn get_reputation(&self, identity: &str) -> f64 {
        self.ledger.reputation(identity)
    }

    /// True if `identity` is trusted.
    #[must_use]
    pub fn is_trusted(&self, identity: &str) -> bool {
        self.ledger.is_trusted(identity)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Queues a reputation save. Returns `false` if the request was dropped.
    pub fn request_save(&self) -> bool {
        self.maintenance_handle.request_save()
    }

    /// Queues a sweep. Returns `false` if the request was dropped.
    pub fn request_sweep(&self) -> bool {
        self.maintenance_handle.request_sweep()
    }

    /// Engine-wide counters.
    #[must_use]
    pub fn stats(&self) -> WardenStats {
        WardenStats {
            sessions: self.sessions.registered(),
            live_sessions: self.sessions.len(),
            tracked_entities: self.store.len(),
            events: self.events.load(Ordering::Relaxed),
            alerts: self.alerts.load(Ordering::Relaxed),
            violations: self.ledger.total_violations(),
            identities: self.ledger.len(),
            models: self.models.summaries(),
            maintenance: self.maintenance_handle.stats(),
            environment: self.environment.snapshot(),
        }
    }

    /// Stops maintenance after a final save and returns its counters.
    pub fn shutdown(mut self) -> MaintenanceStats {
        match self.maintenance.take() {
            Some(worker) => worker.shutdown(),
            None => self.maintenance_handle.stats(),
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Records an alert, and a violation if the session is registered.
    fn flag(&self, entity: EntityId, check: &str, score: f64, timestamp_ms: u64, details: &str) {
        if score < self.config.alert_level {
            return;
        }
        self.alerts.fetch_add(1, Ordering::Relaxed);

        let Some(identity) = self.sessions.identity(entity) else {
            tracing::debug!("{} scored {:.0} on {} without a session", entity, score, check);
            return;
        };
        tracing::warn!("{} ({}) scored {:.0} on {}", entity, identity, score, check);

        let violation = Violation {
            identity: identity.to_string(),
            check_name: check.to_owned(),
            severity: score,
            timestamp_ms,
            details: details.to_owned(),
        };
        if let Err(e) = self.ledger.add_violation(violation) {
            tracing::error!("Failed to record violation for {}: {}", entity, e);
        }
    }

    /// Movement multiplier for the current server health.
    fn lag_factor(&self) -> f64 {
        let snapshot = self.environment.snapshot();
        if snapshot.tps < self.config.lag_tps_floor {
            snapshot.tick_health()
        } else {
            1.0
        }
    }

    fn advance_clock(&self, timestamp_ms: u64) {
        self.host_clock.fetch_max(timestamp_ms, Ordering::AcqRel);
    }

    fn now_ms(&self) -> u64 {
        self.host_clock.load(Ordering::Acquire)
    }
}

/// Newest [`WINDOW`] values of a series.
fn recent(profile: &warden_core::EntityProfile, kind: SeriesKind) -> Vec<f64> {
    profile
        .series(kind)
        .map(|s| s.last_n(WINDOW).copied().collect())
        .unwrap_or_default()
}

fn ground_claim(flags: &MovementFlags) -> GroundClaim {
    GroundClaim {
        claimed_on_ground: flags.claimed_on_ground,
        server_on_ground: flags.server_on_ground,
    }
}

/// Displacement ratio and velocity prediction error between two frames.
fn physics_residuals(prev: &Frame, frame: &Frame) -> (f64, f64) {
    let state = EntityState::from_flags(prev.velocity, &prev.flags);
    let elapsed = frame.timestamp_ms.saturating_sub(prev.timestamp_ms);
    let ticks = u32::try_from((elapsed / TICK_MS).max(1)).unwrap_or(u32::MAX);

    let allowed = physics::expected_distance(&state, ticks);
    let moved = (frame.position - prev.position).horizontal_length();
    let ratio = if allowed > 0.0 { moved / allowed } else { 0.0 };

    let predicted = physics::predict(&state, Medium::from_flags(&prev.flags));
    let error = (frame.velocity - predicted).length();
    (ratio, error)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lagging(f64);

    impl EnvironmentProbe for Lagging {
        fn snapshot(&self) -> EnvironmentSnapshot {
            EnvironmentSnapshot { tps: self.0, ..EnvironmentSnapshot::default() }
        }
    }

    fn engine(dir: &std::path::Path, tps: f64) -> Warden {
        let config = WardenConfig { data_path: dir.join("rep.dat"), ..WardenConfig::default() };
        Warden::with_environment(config, Arc::new(Lagging(tps))).unwrap()
    }

    fn movement(entity: EntityId, x: f64, ts: u64) -> HostEvent {
        HostEvent::Movement {
            entity,
            position: Vec3::new(x, 64.0, 0.0),
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::ZERO,
            flags: MovementFlags { claimed_on_ground: true, server_on_ground: true, ..Default::default() },
            timestamp_ms: ts,
        }
    }

    #[test]
    fn test_lag_scales_movement_only() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 10.0);
        let e = EntityId(1);

        let reading = |x: f64| PositionReading { position: Vec3::new(x, 0.0, 0.0), timestamp_ms: 0 };
        assert_eq!(warden.check_position_spoof(e, reading(50.0), reading(0.0)), 25.0);
        assert_eq!(warden.match_pattern(e, PatternType::PerfectTiming, &[50.0; 10], 0), 95.0);
    }

    #[test]
    fn test_healthy_server_not_scaled() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 19.0);
        let reading = |x: f64| PositionReading { position: Vec3::new(x, 0.0, 0.0), timestamp_ms: 0 };
        assert_eq!(warden.check_position_spoof(EntityId(1), reading(50.0), reading(0.0)), 50.0);
    }

    #[test]
    fn test_first_movement_seeds_only() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 20.0);
        let e = EntityId(4);

        assert_eq!(warden.ingest(&movement(e, 0.0, 0)), 0.0);
        assert!(warden.store.positions(e).is_empty());
        assert_eq!(warden.store.velocities(e).len(), 1);

        // A 40-block jump on the next tick.
        assert_eq!(warden.ingest(&movement(e, 40.0, 50)), 50.0);
    }

    #[test]
    fn test_alert_becomes_violation_for_registered_session() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 20.0);
        let e = EntityId(9);
        warden.register_session(e, "steve").unwrap();

        let mut score = 0.0;
        for i in 0..=10u64 {
            score = warden.ingest(&HostEvent::Click { entity: e, timestamp_ms: i * 100 });
        }
        assert_eq!(score, 95.0);

        let violations = warden.violations_for(e).unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].check_name, "PERFECT_TIMING");
        assert_eq!(warden.get_reputation("steve"), 45.0);
        assert_eq!(warden.stats().alerts, 1);
    }

    #[test]
    fn test_unknown_session_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 20.0);
        assert!(matches!(
            warden.record_violation(EntityId(5), "fly", 90.0, "", 0),
            Err(SecurityError::InvalidInput(_))
        ));
        assert!(warden.record_clean_interval(EntityId(5)).is_err());
        assert!(warden.violations_for(EntityId(5)).is_err());
        assert!(warden.register_session(EntityId(5), "").is_err());
    }

    #[test]
    fn test_disconnect_evicts() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 20.0);
        let e = EntityId(2);
        warden.register_session(e, "alex").unwrap();
        warden.ingest(&movement(e, 0.0, 0));

        assert_eq!(warden.ingest(&HostEvent::Disconnect { entity: e }), 0.0);
        assert!(!warden.disconnect(e));
        assert!(warden.record_clean_interval(e).is_err());
        assert_eq!(warden.stats().tracked_entities, 0);
    }

    #[test]
    fn test_idle_sweep_releases_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let config = WardenConfig {
            data_path: dir.path().join("rep.dat"),
            idle_timeout_secs: 1,
            ..WardenConfig::default()
        };
        let warden = Warden::with_environment(config, Arc::new(Lagging(20.0))).unwrap();
        let anonymous = EntityId(7);
        let player = EntityId(8);
        warden.register_session(player, "alex").unwrap();
        warden.ingest(&movement(anonymous, 0.0, 0));
        warden.ingest(&movement(player, 0.0, 0));
        assert_eq!(warden.stats().live_sessions, 2);

        std::thread::sleep(std::time::Duration::from_millis(1_100));
        assert!(warden.request_sweep());
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while warden.stats().maintenance.sweeps == 0 && std::time::Instant::now() < deadline {
            std::thread::yield_now();
        }

        let stats = warden.stats();
        assert_eq!(stats.maintenance.evicted_profiles, 2);
        assert_eq!(stats.live_sessions, 1);
        assert_eq!(stats.sessions, 1);
        // The registered player keeps its identity; its next frame only seeds.
        assert_eq!(warden.ingest(&movement(player, 40.0, 50)), 0.0);
        assert!(warden.record_clean_interval(player).is_ok());
    }

    #[test]
    fn test_combat_reaction_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let warden = engine(dir.path(), 20.0);
        assert!(warden.record_combat_reaction(EntityId(1), -5.0, 0).is_err());
        assert!(warden.record_combat_reaction(EntityId(1), f64::NAN, 0).is_err());

        let mut score = 0.0;
        for i in 0..5 {
            score = warden.record_combat_reaction(EntityId(1), 20.0, i).unwrap();
        }
        assert_eq!(score, 92.0);
    }

    #[test]
    fn test_physics_residuals() {
        let flags = MovementFlags { server_on_ground: true, sprinting: true, ..Default::default() };
        let prev = Frame {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            velocity: Vec3::new(0.13, 0.0, 0.0),
            flags,
            timestamp_ms: 0,
        };
        let frame = Frame { position: Vec3::new(0.26, 0.0, 0.0), timestamp_ms: 100, ..prev };

        let (ratio, error) = physics_residuals(&prev, &frame);
        // Two ticks of sprinting allow 0.26.
        assert!((ratio - 1.0).abs() < 1e-9);
        // Ground friction predicts 0.078.
        assert!((error - (0.13 - 0.078)).abs() < 1e-9);
    }
}
