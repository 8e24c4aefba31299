//! # Memory Management
//!
//! Fixed-capacity containers for per-entity history.

mod ring;

pub use ring::RingBuffer;
