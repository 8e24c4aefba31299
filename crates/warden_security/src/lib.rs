//! # WARDEN Security - The Detection Pipeline
//!
//! Server-side cheat detection over bounded per-entity telemetry.
//!
//! ## Features
//!
//! - **Movement Validation**: teleports, spoofed rotation, velocity and ground state
//! - **Physics Prediction**: deterministic expected velocity and displacement
//! - **Pattern Recognition**: timing, aim, speed, jitter, reaction, prediction detectors
//! - **Domain Analyzers**: one window analyzer for mining, fishing, crafting, resources
//! - **Adaptive Thresholds**: per-check online learners
//! - **Reputation**: decaying trust per identity, persisted with a SHA-256 digest
//!
//! ## Architecture
//!
//! ```text
//! HOST FEED                               DETECTION
//!     │                                       │
//!     │─── movement ──► MovementValidator ───►│
//!     │─── samples ───► PatternEngine ───────►│ suspicion [0, 100]
//!     │─── resources ─► WindowAnalyzer ──────►│
//!     │                                       ▼
//!     │                               ModelRegistry (calibrate)
//!     │                                       │
//!     │                                       ▼
//!     │                               ReputationLedger ──► MaintenanceWorker ──► Disk
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod analyzer;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod model;
pub mod movement;
pub mod pattern;
pub mod physics;
pub mod reputation;

pub use analyzer::{ScoringStrategy, WindowAnalyzer};
pub use config::WardenConfig;
pub use error::{SecurityError, SecurityResult};
pub use maintenance::{EvictionHook, MaintenanceHandle, MaintenanceStats, MaintenanceWorker};
pub use model::{DetectionModel, ModelPhase, ModelRegistry, ModelSummary};
pub use movement::{GroundClaim, MovementValidator, PositionReading, RotationReading};
pub use pattern::PatternEngine;
pub use physics::{EntityState, Medium};
pub use reputation::{ReputationLedger, ReputationProfile, Violation};
