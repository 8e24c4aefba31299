//! # Violation & Reputation Ledger
//!
//! Keeps the violation logs and the per-identity reputation table.
//!
//! ## Rules
//!
//! - Reputation starts at 50, loses 5 per violation and gains 1 per clean
//!   interval. It is clamped to `[0, 100]` after every update.
//! - An identity is trusted strictly above 75.
//! - Logs are bounded: 1,000 entries globally, 10,000 per identity. Entries
//!   past the retention window are dropped by [`ReputationLedger::purge_expired`].
//!
//! Reputation is keyed by the host's persistent identity, not by the
//! session's [`EntityId`](warden_shared::EntityId), so it survives reconnects.

pub mod persistence;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use warden_shared::constants::{
    CLEAN_INTERVAL_REWARD, DEFAULT_REPUTATION, ENTITY_VIOLATION_CAPACITY,
    GLOBAL_VIOLATION_CAPACITY, TRUSTED_REPUTATION, VIOLATION_PENALTY,
};

use crate::error::{SecurityError, SecurityResult};

/// Highest reputation.
pub const MAX_REPUTATION: f64 = 100.0;

/// Reputation of one identity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ReputationProfile {
    /// Trust in `[0, 100]`.
    pub reputation: f64,
    /// Violations recorded over the identity's lifetime.
    pub violation_count: u64,
}

impl Default for ReputationProfile {
    fn default() -> Self {
        Self { reputation: DEFAULT_REPUTATION, violation_count: 0 }
    }
}

/// A recorded violation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    /// Persistent identity of the offender.
    pub identity: String,
    /// Check that fired.
    pub check_name: String,
    /// Suspicion score that triggered the violation.
    pub severity: f64,
    /// Host timestamp in milliseconds.
    pub timestamp_ms: u64,
    /// Free-form context.
    pub details: String,
}

/// The violation and reputation ledger.
pub struct ReputationLedger {
    profiles: DashMap<String, ReputationProfile>,
    global_log: Mutex<VecDeque<Violation>>,
    identity_logs: DashMap<String, VecDeque<Violation>>,
    total_violations: AtomicU64,
    dirty: AtomicBool,
}

impl Default for ReputationLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ReputationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
            global_log: Mutex::new(VecDeque::with_capacity(GLOBAL_VIOLATION_CAPACITY)),
            identity_logs: DashMap::new(),
            total_violations: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// Records a violation and returns the offender's new reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an empty identity or check name,
    /// or a non-finite severity.
    pub fn add_violation(&self, violation: Violation) -> SecurityResult<f64> {
        validate_identity(&violation.identity)?;
        if violation.check_name.is_empty() {
            return Err(SecurityError::InvalidInput("empty check name".into()));
        }
        if !violation.severity.is_finite() {
            return Err(SecurityError::InvalidInput(format!(
                "non-finite severity for {}",
                violation.identity
            )));
        }

        let reputation = {
            let mut profile = self.profiles.entry(violation.identity.clone()).or_default();
            profile.violation_count += 1;
            profile.reputation = (profile.reputation - VIOLATION_PENALTY).clamp(0.0, MAX_REPUTATION);
            profile.reputation
        };

        {
            let mut log = self.identity_logs.entry(violation.identity.clone()).or_default();
            if log.len() == ENTITY_VIOLATION_CAPACITY {
                log.pop_front();
            }
            log.push_back(violation.clone());
        }

        tracing::debug!(
            "Violation {} by {} (severity {:.1}, reputation now {:.1})",
            violation.check_name,
            violation.identity,
            violation.severity,
            reputation
        );

        {
            let mut global = self.global_log.lock();
            if global.len() == GLOBAL_VIOLATION_CAPACITY {
                global.pop_front();
            }
            global.push_back(violation);
        }

        self.total_violations.fetch_add(1, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Release);
        Ok(reputation)
    }

    /// Rewards a clean interval and returns the new reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidInput`] for an empty identity.
    pub fn record_clean_interval(&self, identity: &str) -> SecurityResult<f64> {
        validate_identity(identity)?;
        let mut profile = self.profiles.entry(identity.to_owned()).or_default();
        profile.reputation = (profile.reputation + CLEAN_INTERVAL_REWARD).clamp(0.0, MAX_REPUTATION);
        self.dirty.store(true, Ordering::Release);
        Ok(profile.reputation)
    }

    /// Reputation of `identity`; unknown identities have the default.
    #[must_use]
    pub fn reputation(&self, identity: &str) -> f64 {
        self.profile(identity).reputation
    }

    /// Full profile of `identity`.
    #[must_use]
    pub fn profile(&self, identity: &str) -> ReputationProfile {
        self.profiles.get(identity).map(|p| *p).unwrap_or_default()
    }

    /// True if `identity`'s reputation is above the trust line.
    #[must_use]
    pub fn is_trusted(&self, identity: &str) -> bool {
        self.reputation(identity) > TRUSTED_REPUTATION
    }

    /// Retained violations of `identity`, oldest first.
    #[must_use]
    pub fn violations_for(&self, identity: &str) -> Vec<Violation> {
        self.identity_logs
            .get(identity)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The newest `limit` entries of the global log, oldest first.
    #[must_use]
    pub fn recent_violations(&self, limit: usize) -> Vec<Violation> {
        let global = self.global_log.lock();
        global.iter().skip(global.len().saturating_sub(limit)).cloned().collect()
    }

    /// Violations ever recorded by this process.
    #[must_use]
    pub fn total_violations(&self) -> u64 {
        self.total_violations.load(Ordering::Relaxed)
    }

    /// Identities with a reputation entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// True if no identity has a reputation entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Drops log entries older than `retention_ms` relative to `now_ms`.
    ///
    /// Returns the number of entries removed across all logs. Reputation
    /// and lifetime counters are untouched.
    pub fn purge_expired(&self, now_ms: u64, retention_ms: u64) -> usize {
        let expired = |v: &Violation| now_ms.saturating_sub(v.timestamp_ms) > retention_ms;

        let mut removed = {
            let mut global = self.global_log.lock();
            let before = global.len();
            global.retain(|v| !expired(v));
            before - global.len()
        };

        for mut log in self.identity_logs.iter_mut() {
            let before = log.len();
            log.retain(|v| !expired(v));
            removed += before - log.len();
        }
        self.identity_logs.retain(|_, log| !log.is_empty());

        if removed > 0 {
            tracing::info!("Purged {} expired violation records", removed);
        }
        removed
    }

    /// Copy of the reputation table, sorted by identity.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, ReputationProfile)> {
        let mut records: Vec<(String, ReputationProfile)> =
            self.profiles.iter().map(|e| (e.key().clone(), *e.value())).collect();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    /// Replaces the reputation table. Logs are left alone.
    pub fn restore(&self, records: Vec<(String, ReputationProfile)>) {
        self.profiles.clear();
        for (identity, profile) in records {
            self.profiles.insert(identity, profile);
        }
        self.dirty.store(false, Ordering::Release);
    }

    /// Clears the dirty flag and reports whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    /// Flags the table as changed since the last save.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Writes the reputation table to `path`. Returns the record count.
    ///
    /// # Errors
    ///
    /// [`SecurityError::Persistence`] if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> SecurityResult<usize> {
        let records = self.snapshot();
        persistence::save(path, &records)?;
        Ok(records.len())
    }

    /// Replaces the reputation table with the one stored at `path`.
    ///
    /// A missing file loads nothing. On any error the table is left empty,
    /// so every identity falls back to the default reputation.
    ///
    /// # Errors
    ///
    /// [`SecurityError::IntegrityFailure`] for a tampered or malformed file,
    /// [`SecurityError::Persistence`] if it cannot be read.
    pub fn load_from(&self, path: &Path) -> SecurityResult<usize> {
        match persistence::load(path) {
            Ok(records) => {
                let count = records.len();
                self.restore(records);
                tracing::info!("Loaded {} reputation records from {}", count, path.display());
                Ok(count)
            }
            Err(e) => {
                self.restore(Vec::new());
                tracing::warn!("Discarding reputation data at {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

fn validate_identity(identity: &str) -> SecurityResult<()> {
    if identity.is_empty() {
        return Err(SecurityError::InvalidInput("empty identity".into()));
    }
    Ok(())
}
