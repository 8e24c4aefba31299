//! # WARDEN Shared
//!
//! Common types used by the detection core and by the host server feeding it.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - threading or locking crates
//! - anything that performs I/O
//!
//! If you need shared state, put it in `warden_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod environment;
pub mod events;
pub mod math;

pub use constants::{HISTORY_CAPACITY, TICK_RATE};
pub use environment::{EnvironmentProbe, EnvironmentSnapshot, StaticEnvironment};
pub use events::{EntityId, HostEvent, MovementFlags};
pub use math::{normalize_yaw, Vec3};
