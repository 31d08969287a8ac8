//! temposcale-engine: a real-time WSOLA (Waveform-Similarity Overlap-Add)
//! time-scale modification engine.
//!
//! Changes the playback tempo of a planar `f32` audio stream without
//! altering its pitch. The engine is a single-threaded, synchronous
//! stateful transformer: no I/O, no resampling, no pitch shifting.
//!
//! ## Core modules
//! - `config` - construction-time configuration (playback rate bounds,
//!   OLA window/search sizes)
//! - `window` - precomputed Hann and triangular transition windows
//! - `input_buffer` - ring-style planar append buffer with zero-prepend peek
//! - `search` - energy-normalized cross-correlation similarity search
//! - `synth` - WSOLA synthesis: block extraction, transition blend,
//!   overlap-add, fractional clock bookkeeping
//! - `engine` - public API: `push` / `pull` / `set_final` /
//!   `frames_available` / `latency` / `reset`

mod block;
mod config;
mod engine;
mod input_buffer;
mod search;
mod synth;
mod window;

pub use config::EngineConfig;
pub use engine::Engine;
pub use temposcale_core::{Sample, TsError, TsResult};
