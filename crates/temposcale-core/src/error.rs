//! Error types for TempoScale.

use thiserror::Error;

/// Construction-time failure. Mid-stream operations never return a `Result`:
/// push/pull signal backpressure through their return counts, not errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TsError {
    #[error("invalid channel count: {0} (must be in [1, 8])")]
    InvalidChannelCount(usize),

    #[error("invalid sample rate: {0} (must be > 0)")]
    InvalidSampleRate(u32),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for fallible construction.
pub type TsResult<T> = Result<T, TsError>;
