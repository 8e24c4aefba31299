//! # Bounded Telemetry Store
//!
//! Per-entity ring buffers of typed samples.
//!
//! ## Contract
//!
//! - `record_*` never fails; capacity is enforced by evicting the oldest sample
//! - `snapshot` returns an owned copy, oldest to newest
//! - `evict` removes everything for an entity and is idempotent

mod profile;
mod samples;
mod store;

pub use profile::EntityProfile;
pub use samples::{
    BufferKind, DomainKind, PatternSample, PatternType, PositionSample, RotationSample,
    SeriesKind, Snapshot,
};
pub use store::{ProfileHandle, TelemetryStore};
