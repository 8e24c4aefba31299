//! # Detection Constants
//!
//! Tuning values for the WARDEN detection core.
//!
//! **CRITICAL:** Changing any of these shifts every suspicion score the
//! engine produces. Scores are only comparable across builds that share them.

// =============================================================================
// SERVER CADENCE
// =============================================================================

/// Host tick rate (updates per second).
pub const TICK_RATE: u32 = 20;

/// Nominal ticks per second as a float, used for lag leniency.
pub const NOMINAL_TPS: f64 = 20.0;

// =============================================================================
// BOUNDED HISTORY
// =============================================================================

/// Capacity of every per-entity telemetry ring buffer.
pub const HISTORY_CAPACITY: usize = 50;

/// Capacity of each detection model's labeled training buffer.
pub const TRAINING_CAPACITY: usize = 1_000;

/// Capacity of the global recent-violation log.
pub const GLOBAL_VIOLATION_CAPACITY: usize = 1_000;

/// Capacity of each per-entity violation log.
pub const ENTITY_VIOLATION_CAPACITY: usize = 10_000;

/// Default hours a violation record is kept before the maintenance sweep
/// purges it.
pub const VIOLATION_RETENTION_HOURS: u64 = 24;

// =============================================================================
// SCORING
// =============================================================================

/// Upper bound of every suspicion score.
pub const MAX_SUSPICION: f64 = 100.0;

/// Velocity magnitude at or below which an entity counts as idle.
pub const IDLE_VELOCITY_EPSILON: f64 = 0.01;

// =============================================================================
// REPUTATION
// =============================================================================

/// Reputation assigned to an identity we have never seen.
pub const DEFAULT_REPUTATION: f64 = 50.0;

/// Reputation lost per recorded violation.
pub const VIOLATION_PENALTY: f64 = 5.0;

/// Reputation gained per clean interval.
pub const CLEAN_INTERVAL_REWARD: f64 = 1.0;

/// Identities strictly above this reputation are trusted.
pub const TRUSTED_REPUTATION: f64 = 75.0;
