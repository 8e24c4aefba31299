//! # WARDEN
//!
//! Server-side cheat detection for game servers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          WARDEN ENGINE                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌────────────────┐    ┌────────────────┐    ┌────────────────┐  │
//! │  │  warden_core   │    │ warden_security│    │ warden_security│  │
//! │  │  Telemetry     │───>│  Detectors     │───>│  Reputation    │  │
//! │  │                │    │                │    │                │  │
//! │  │ • Ring buffers │    │ • Movement     │    │ • Violations   │  │
//! │  │ • Profiles     │    │ • Patterns     │    │ • Trust        │  │
//! │  │ • Statistics   │    │ • Domains      │    │ • Persistence  │  │
//! │  └────────────────┘    │ • Models       │    └───────┬────────┘  │
//! │                        └────────────────┘            │           │
//! │                                              ┌───────▼────────┐  │
//! │                                              │  Maintenance   │  │
//! │                                              │  (disk, sweep) │  │
//! │                                              └────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden::{EntityId, HostEvent, Warden, WardenConfig};
//!
//! let warden = Warden::open(WardenConfig::default())?;
//! warden.register_session(EntityId(1), "player-uuid")?;
//! let score = warden.ingest(&HostEvent::Click { entity: EntityId(1), timestamp_ms: 0 });
//! assert_eq!(score, 0.0);
//! warden.shutdown();
//! # Ok::<(), warden::SecurityError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod engine;
mod session;

// Re-export the layers
pub use warden_core as core;
pub use warden_security as security;
pub use warden_shared as shared;

// Re-export commonly used types
pub use engine::{MovementReport, Warden, WardenStats};
pub use warden_core::{DomainKind, PatternType};
pub use warden_security::{
    GroundClaim, PositionReading, RotationReading, SecurityError, SecurityResult, Violation,
    WardenConfig,
};
pub use warden_shared::{
    EntityId, EnvironmentProbe, EnvironmentSnapshot, HostEvent, MovementFlags, StaticEnvironment,
    Vec3,
};
