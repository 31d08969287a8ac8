//! Construction-time configuration.

use temposcale_core::{TsError, TsResult};

/// Maximum channel count the engine accepts at construction.
pub const MAX_CHANNELS: usize = 8;

/// Configuration scalars for the WSOLA engine, immutable after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Rates below this are muted.
    pub min_playback_rate: f64,
    /// Rates above this are muted.
    pub max_playback_rate: f64,
    /// Overlap-and-add window size, in milliseconds.
    pub ola_window_size_ms: f64,
    /// Search interval width (symmetric, total span is 2x this), in milliseconds.
    pub wsola_search_interval_ms: f64,
    /// Tolerance around `rate == 1.0` treated as exact passthrough.
    pub passthrough_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_playback_rate: 0.25,
            max_playback_rate: 4.0,
            ola_window_size_ms: 20.0,
            wsola_search_interval_ms: 30.0,
            passthrough_epsilon: 1e-6,
        }
    }
}

impl EngineConfig {
    /// Validate this configuration together with the construction parameters
    /// it will be combined with. Mirrors the range checks the reference
    /// `mp_scaletempo2_create` performs inline.
    pub fn validate(&self, channels: usize, sample_rate: u32) -> TsResult<()> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(TsError::InvalidChannelCount(channels));
        }
        if sample_rate == 0 {
            return Err(TsError::InvalidSampleRate(sample_rate));
        }
        if self.min_playback_rate <= 0.0 || self.min_playback_rate > self.max_playback_rate {
            return Err(TsError::InvalidConfig(format!(
                "min_playback_rate ({}) must be > 0 and <= max_playback_rate ({})",
                self.min_playback_rate, self.max_playback_rate
            )));
        }
        if self.ola_window_size_ms <= 0.0 {
            return Err(TsError::InvalidConfig(format!(
                "ola_window_size_ms ({}) must be > 0",
                self.ola_window_size_ms
            )));
        }
        if self.wsola_search_interval_ms < 0.0 {
            return Err(TsError::InvalidConfig(format!(
                "wsola_search_interval_ms ({}) must be >= 0",
                self.wsola_search_interval_ms
            )));
        }
        Ok(())
    }

    /// Derive `ola_window_size`: rounded to an even integer >= 2.
    pub fn ola_window_size(&self, sample_rate: u32) -> usize {
        let raw = (self.ola_window_size_ms * sample_rate as f64 / 1000.0).round() as i64;
        let raw = raw.max(2);
        (if raw % 2 == 0 { raw } else { raw + 1 }) as usize
    }

    /// Derive `num_candidate_blocks`: rounded to an odd integer >= 1.
    pub fn num_candidate_blocks(&self, sample_rate: u32) -> usize {
        let raw = (self.wsola_search_interval_ms * sample_rate as f64 / 1000.0).round() as i64;
        let raw = raw.max(1);
        (if raw % 2 == 1 { raw } else { raw + 1 }) as usize
    }
}
