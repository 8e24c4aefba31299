//! # Security Error Types
//!
//! All errors that can escape the detection pipeline.
//!
//! Insufficient evidence is NOT an error: detectors return a score of zero.

use thiserror::Error;

/// Errors that can occur in the detection pipeline.
#[derive(Error, Debug)]
pub enum SecurityError {
    /// Caller broke an input contract (empty identity, non-finite sample).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persisted data failed its integrity check.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// Reading or writing persisted data failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for security operations.
pub type SecurityResult<T> = Result<T, SecurityError>;
