//! temposcale-core: shared types and errors for the TempoScale WSOLA engine.
//!
//! This crate provides the foundational types used by `temposcale-engine`.

mod error;
mod sample;

pub use error::{TsError, TsResult};
pub use sample::Sample;
