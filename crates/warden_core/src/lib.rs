//! # WARDEN Core
//!
//! Bounded per-entity telemetry history, the foundation of every detector.
//!
//! ## Architecture Rules
//!
//! 1. **Bounded memory** - every history is a fixed-capacity ring buffer
//! 2. **One lock per entity** - entities never contend with each other
//! 3. **Copy on read** - snapshots are owned copies, immune to later writes
//!
//! ## Example
//!
//! ```rust
//! use warden_core::TelemetryStore;
//! use warden_shared::{EntityId, Vec3};
//!
//! let store = TelemetryStore::new();
//! store.record_velocity(EntityId(1), Vec3::new(0.2, 0.0, 0.0));
//! assert_eq!(store.velocities(EntityId(1)).len(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod stats;
pub mod telemetry;

pub use memory::RingBuffer;
pub use stats::RunningStats;
pub use telemetry::{
    BufferKind, DomainKind, EntityProfile, PatternSample, PatternType, PositionSample,
    RotationSample, SeriesKind, Snapshot, TelemetryStore,
};
