//! # Runtime Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! data_path = "data/reputation.dat"
//! sweep_interval_secs = 60
//! save_interval_secs = 300
//! violation_retention_hours = 24
//! idle_timeout_secs = 600
//! lag_tps_floor = 18.0
//! alert_level = 80.0
//! save_queue_capacity = 16
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_shared::constants::{MAX_SUSPICION, NOMINAL_TPS, VIOLATION_RETENTION_HOURS};

use crate::error::{SecurityError, SecurityResult};

/// Detection engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    /// Reputation table location.
    pub data_path: PathBuf,
    /// Seconds between maintenance sweeps.
    pub sweep_interval_secs: u64,
    /// Seconds between periodic reputation saves.
    pub save_interval_secs: u64,
    /// Hours a violation record is retained.
    pub violation_retention_hours: u64,
    /// Seconds without events before a profile is evicted.
    pub idle_timeout_secs: u64,
    /// TPS below which movement scores are scaled down.
    pub lag_tps_floor: f64,
    /// Suspicion at or above which a check records a violation.
    pub alert_level: f64,
    /// Pending save requests before new ones are dropped.
    pub save_queue_capacity: usize,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/reputation.dat"),
            sweep_interval_secs: 60,
            save_interval_secs: 300,
            violation_retention_hours: VIOLATION_RETENTION_HOURS,
            idle_timeout_secs: 600,
            lag_tps_floor: 18.0,
            alert_level: 80.0,
            save_queue_capacity: 16,
        }
    }
}

impl WardenConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidConfig`] on a parse or validation failure.
    pub fn from_toml_str(source: &str) -> SecurityResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SecurityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`SecurityError::Persistence`] if the file cannot be read, otherwise
    /// as [`WardenConfig::from_toml_str`].
    pub fn from_file(path: &Path) -> SecurityResult<Self> {
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks every field for a usable value.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> SecurityResult<()> {
        let nonzero = [
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("save_interval_secs", self.save_interval_secs),
            ("violation_retention_hours", self.violation_retention_hours),
            ("idle_timeout_secs", self.idle_timeout_secs),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(SecurityError::InvalidConfig(format!("{field} must be greater than zero")));
        }
        if self.save_queue_capacity == 0 {
            return Err(SecurityError::InvalidConfig("save_queue_capacity must be greater than zero".into()));
        }
        if self.data_path.as_os_str().is_empty() {
            return Err(SecurityError::InvalidConfig("data_path must not be empty".into()));
        }
        if !(self.lag_tps_floor.is_finite() && (0.0..=NOMINAL_TPS).contains(&self.lag_tps_floor)) {
            return Err(SecurityError::InvalidConfig(format!(
                "lag_tps_floor must lie in [0, {NOMINAL_TPS}]"
            )));
        }
        if !(self.alert_level.is_finite() && (0.0..=MAX_SUSPICION).contains(&self.alert_level)) {
            return Err(SecurityError::InvalidConfig(format!(
                "alert_level must lie in [0, {MAX_SUSPICION}]"
            )));
        }
        Ok(())
    }

    /// Time between maintenance sweeps.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Time between periodic saves.
    #[must_use]
    pub const fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }

    /// Violation retention window.
    #[must_use]
    pub const fn violation_retention(&self) -> Duration {
        Duration::from_secs(self.violation_retention_hours.saturating_mul(3_600))
    }

    /// Idle time before a profile is evicted.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
