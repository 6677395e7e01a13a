//! Error types for the emitter.

use thiserror::Error;

/// Main error type for emitter construction.
///
/// Registration, removal and every emit variant are total; only building an
/// emitter from a user-supplied configuration can fail.
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for emitter operations.
pub type Result<T> = std::result::Result<T, EmitterError>;
