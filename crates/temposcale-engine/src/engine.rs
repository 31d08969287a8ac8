//! Public API glue: lifecycle, rate gating, final-flush logic, per spec §2/§4.6.

use crate::config::EngineConfig;
use crate::input_buffer::InputBuffer;
use crate::synth::{IterationOutcome, WsolaSynthesizer};
use temposcale_core::{Sample, TsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Muted,
    Passthrough,
    Wsola,
}

/// A real-time WSOLA time-scale modification engine for one stream.
///
/// Single-threaded and synchronous: every operation completes before
/// returning, and all buffers are owned exclusively by the instance.
pub struct Engine {
    channels: usize,
    sample_rate: u32,
    config: EngineConfig,

    input: InputBuffer,
    synth: WsolaSynthesizer,

    is_final: bool,
    /// Remaining silence frames the engine still owes itself to flush the
    /// final partial window, per spec §3 `input_final_frames`.
    final_frames_owed: usize,
    /// Fractional input-frame debt eaten while muted, per spec §3
    /// `muted_partial_frame`.
    muted_partial_frame: f64,
    /// Last regime reported to `log::trace!`, so transitions log once
    /// instead of once per `pull`.
    last_regime: Option<Regime>,
}

impl Engine {
    /// Construct a new engine. `channels` must be in `[1, 8]`, `sample_rate`
    /// must be nonzero, and `config` must pass its own validation.
    pub fn new(channels: usize, sample_rate: u32, config: EngineConfig) -> TsResult<Self> {
        config.validate(channels, sample_rate)?;

        let ola_window_size = config.ola_window_size(sample_rate);
        let num_candidate_blocks = config.num_candidate_blocks(sample_rate);

        log::debug!(
            "creating engine: channels={} sample_rate={} ola_window_size={} num_candidate_blocks={}",
            channels,
            sample_rate,
            ola_window_size,
            num_candidate_blocks
        );

        Ok(Self {
            channels,
            sample_rate,
            config,
            input: InputBuffer::new(channels),
            synth: WsolaSynthesizer::new(channels, ola_window_size, num_candidate_blocks),
            is_final: false,
            final_frames_owed: 0,
            muted_partial_frame: 0.0,
            last_regime: None,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn classify(&self, rate: f64) -> Regime {
        if rate < self.config.min_playback_rate || rate > self.config.max_playback_rate {
            Regime::Muted
        } else if (rate - 1.0).abs() < self.config.passthrough_epsilon {
            Regime::Passthrough
        } else {
            Regime::Wsola
        }
    }

    /// Classify `rate` and log a `log::trace!` line the first time the
    /// regime changes, per spec §4.6. Does not log on every `pull`.
    fn regime(&mut self, rate: f64) -> Regime {
        let regime = self.classify(rate);
        if self.last_regime != Some(regime) {
            log::trace!("engine regime transition: {:?} -> {:?}", self.last_regime, regime);
            self.last_regime = Some(regime);
        }
        regime
    }

    /// Append up to `n` frames of planar audio. Returns frames actually
    /// consumed: `0` if the stream has been marked final (it refuses
    /// further input until drained), `n` otherwise.
    pub fn push(&mut self, planes: &[&[Sample]], n: usize, _rate: f64) -> usize {
        debug_assert_eq!(planes.len(), self.channels);
        if self.is_final {
            return 0;
        }
        self.input.append(planes, n);
        n
    }

    /// Produce up to `cap` frames of time-scaled planar audio into `dest`.
    /// Returns frames actually produced.
    pub fn pull(&mut self, dest: &mut [&mut [Sample]], cap: usize, rate: f64) -> usize {
        debug_assert_eq!(dest.len(), self.channels);
        match self.regime(rate) {
            Regime::Muted => self.pull_muted(dest, cap, rate),
            Regime::Passthrough => self.pull_passthrough(dest, cap),
            Regime::Wsola => self.pull_wsola(dest, cap, rate),
        }
    }

    fn pull_muted(&mut self, dest: &mut [&mut [Sample]], cap: usize, rate: f64) -> usize {
        let mut produced = 0;
        while produced < cap {
            if self.input.frames() == 0 {
                break;
            }
            for ch in dest.iter_mut() {
                ch[produced] = 0.0;
            }
            produced += 1;

            self.muted_partial_frame += rate;
            let whole = self.muted_partial_frame.floor();
            if whole > 0.0 {
                let evict = (whole as usize).min(self.input.frames());
                self.input.evict(evict);
                self.muted_partial_frame -= whole;
            }
        }
        produced
    }

    fn pull_passthrough(&mut self, dest: &mut [&mut [Sample]], cap: usize) -> usize {
        let produced = cap.min(self.input.frames());
        if produced == 0 {
            return 0;
        }
        let mut scratch = vec![Vec::new(); self.channels];
        self.input.peek_zero_prepend(&mut scratch, 0, produced);
        for (ch, src) in dest.iter_mut().zip(scratch.iter()) {
            ch[..produced].copy_from_slice(&src[..produced]);
        }
        self.input.evict(produced);
        produced
    }

    fn pull_wsola(&mut self, dest: &mut [&mut [Sample]], cap: usize, rate: f64) -> usize {
        let mut produced = 0;
        while produced < cap {
            if self.synth.complete_frames() == 0 {
                if !self.ensure_input_for_iteration() {
                    break;
                }
                if self.synth.try_iterate(&mut self.input, rate) == IterationOutcome::NeedsMoreInput {
                    break;
                }
            }
            let room = cap - produced;
            let to_drain = room.min(self.synth.complete_frames());
            if to_drain == 0 {
                break;
            }
            produced += self.synth.drain_into(dest, produced, to_drain);
        }
        produced
    }

    /// Ensure the input buffer holds everything the next iteration needs,
    /// topping up with owed silence if the stream is final. Returns `false`
    /// if the iteration cannot proceed right now.
    fn ensure_input_for_iteration(&mut self) -> bool {
        let required = self.synth.required_frames();
        let available = self.input.frames() as i64;
        if required <= available {
            return true;
        }
        let missing = (required - available) as usize;
        if !self.is_final {
            return false;
        }
        let pad = missing.min(self.final_frames_owed);
        if pad > 0 {
            self.input.append_silence(pad);
            self.final_frames_owed -= pad;
        }
        pad == missing
    }

    /// Mark the input stream as closed. Idempotent. After this, the engine
    /// pads with silence as necessary to drain residual frames, and refuses
    /// further `push`.
    pub fn set_final(&mut self) {
        if self.is_final {
            return;
        }
        self.is_final = true;
        // Enough silence to let the last real samples pass fully through
        // the center of the search/target windows: one window plus one
        // search span of epilogue.
        self.final_frames_owed = self.synth.ola_window_size() + self.config.num_candidate_blocks(self.sample_rate);
        log::debug!(
            "engine set_final: owed {} frames of epilogue silence",
            self.final_frames_owed
        );
    }

    /// Whether a subsequent `pull` would produce at least one frame.
    pub fn frames_available(&self, rate: f64) -> bool {
        match self.classify(rate) {
            Regime::Muted | Regime::Passthrough => self.input.frames() > 0,
            Regime::Wsola => {
                if self.synth.complete_frames() > 0 {
                    return true;
                }
                let required = self.synth.required_frames();
                let available = self.input.frames() as i64;
                if required <= available {
                    return true;
                }
                if self.is_final {
                    let missing = (required - available) as usize;
                    return missing <= self.final_frames_owed;
                }
                false
            }
        }
    }

    /// Input frames currently held by the engine that have not yet
    /// contributed to emitted output, expressed at the input timeline.
    pub fn latency(&self, _rate: f64) -> f64 {
        self.input.frames() as f64
    }

    /// Discard all buffered audio and return to the just-constructed state.
    /// Allocations are retained.
    pub fn reset(&mut self) {
        self.input.clear();
        self.synth.reset();
        self.is_final = false;
        self.final_frames_owed = 0;
        self.muted_partial_frame = 0.0;
        self.last_regime = None;
        log::trace!("engine reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_engine(channels: usize, sample_rate: u32) -> Engine {
        Engine::new(channels, sample_rate, EngineConfig::default()).unwrap()
    }

    fn sine(len: usize, freq: f64, sample_rate: f64) -> Vec<Sample> {
        (0..len)
            .map(|i| ((2.0 * std::f64::consts::PI * freq * i as f64 / sample_rate).sin()) as Sample)
            .collect()
    }

    #[test]
    fn construction_rejects_invalid_params() {
        assert!(Engine::new(0, 44100, EngineConfig::default()).is_err());
        assert!(Engine::new(9, 44100, EngineConfig::default()).is_err());
        assert!(Engine::new(2, 0, EngineConfig::default()).is_err());
        assert!(Engine::new(2, 44100, EngineConfig::default()).is_ok());
    }

    #[test]
    fn passthrough_is_sample_exact() {
        let mut engine = make_engine(1, 44100);
        let input = sine(2000, 440.0, 44100.0);
        engine.push(&[&input], input.len(), 1.0);

        let mut out = vec![0.0 as Sample; input.len()];
        let produced = {
            let mut dest: Vec<&mut [Sample]> = vec![&mut out[..]];
            engine.pull(&mut dest, input.len(), 1.0)
        };
        assert_eq!(produced, input.len());
        assert_eq!(out, input);
    }

    #[test]
    fn mute_emits_zeros_and_consumes_input() {
        let mut engine = make_engine(1, 44100);
        let input = vec![1.0 as Sample; 1000];
        engine.push(&[&input], input.len(), 0.1);

        let mut out = vec![1.0 as Sample; 500];
        let produced = {
            let mut dest: Vec<&mut [Sample]> = vec![&mut out[..]];
            engine.pull(&mut dest, 500, 0.1)
        };
        assert!(produced > 0);
        assert!(out[..produced].iter().all(|&s| s == 0.0));
        assert!(engine.latency(0.1) < 1000.0);
    }

    #[test]
    fn zeros_in_zeros_out_at_unity_rate() {
        let mut engine = make_engine(2, 44100);
        let l = vec![0.0 as Sample; 3000];
        let r = vec![0.0 as Sample; 3000];
        engine.push(&[&l, &r], 3000, 1.0);
        engine.set_final();

        let mut total = 0usize;
        loop {
            let mut a = vec![0.0 as Sample; 512];
            let mut b = vec![0.0 as Sample; 512];
            let produced = {
                let mut dest: Vec<&mut [Sample]> = vec![&mut a[..], &mut b[..]];
                engine.pull(&mut dest, 512, 1.0)
            };
            if produced == 0 {
                break;
            }
            assert!(a[..produced].iter().all(|&s| s == 0.0));
            assert!(b[..produced].iter().all(|&s| s == 0.0));
            total += produced;
        }
        let window = engine.config.ola_window_size(engine.sample_rate) as i64;
        assert!((total as i64 - 3000).abs() <= window);
    }

    #[test]
    fn reset_returns_to_fresh_state() {
        let mut engine = make_engine(1, 44100);
        let input = sine(4000, 440.0, 44100.0);
        engine.push(&[&input], input.len(), 1.5);
        let mut out = vec![0.0 as Sample; 200];
        {
            let mut dest: Vec<&mut [Sample]> = vec![&mut out[..]];
            engine.pull(&mut dest, 200, 1.5);
        }
        engine.reset();
        assert_eq!(engine.latency(1.0), 0.0);
        assert!(!engine.frames_available(1.0));
    }

    #[test]
    fn set_final_is_idempotent_and_refuses_push() {
        let mut engine = make_engine(1, 44100);
        engine.set_final();
        engine.set_final();
        let input = vec![0.0 as Sample; 10];
        let consumed = engine.push(&[&input], 10, 1.0);
        assert_eq!(consumed, 0);
    }

    #[test]
    fn no_nan_or_inf_in_wsola_regime() {
        let mut engine = make_engine(1, 44100);
        let input = sine(20000, 440.0, 44100.0);
        engine.push(&[&input], input.len(), 1.7);
        engine.set_final();

        loop {
            let mut out = vec![0.0 as Sample; 512];
            let produced = {
                let mut dest: Vec<&mut [Sample]> = vec![&mut out[..]];
                engine.pull(&mut dest, 512, 1.7)
            };
            if produced == 0 {
                break;
            }
            assert!(out[..produced].iter().all(|s| s.is_finite()));
        }
    }
}
