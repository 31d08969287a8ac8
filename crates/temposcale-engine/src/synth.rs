//! WSOLA synthesizer: one iteration produces exactly `ola_hop_size`
//! additional complete output frames, per spec §4.5.

use crate::block;
use crate::input_buffer::InputBuffer;
use crate::search;
use crate::window;
use temposcale_core::Sample;

/// `ε` guarding the similarity-search score denominator against
/// divide-by-zero, per spec §4.4. We use `f32::EPSILON` explicitly (the
/// natural analogue of the reference's `FLT_EPSILON`), widened to `f64`
/// since the search accumulates in double precision.
const SEARCH_EPSILON: f64 = f32::EPSILON as f64;

/// Outcome of attempting one WSOLA iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A full hop of output was produced.
    Produced,
    /// The search block needs frames beyond what the input buffer holds,
    /// and the stream has not been marked final.
    NeedsMoreInput,
}

pub struct WsolaSynthesizer {
    channels: usize,
    ola_window_size: usize,
    ola_hop_size: usize,
    num_candidate_blocks: usize,
    search_block_size: usize,

    ola_window: Vec<Sample>,
    transition_window: Vec<Sample>,

    target_block: Vec<Vec<Sample>>,
    search_block: Vec<Vec<Sample>>,
    optimal_block: Vec<Vec<Sample>>,

    wsola_output: Vec<Vec<Sample>>,
    num_complete_frames: usize,
    wsola_output_started: bool,

    output_time: f64,
    search_block_index: i64,
    target_block_index: i64,
}

impl WsolaSynthesizer {
    pub fn new(channels: usize, ola_window_size: usize, num_candidate_blocks: usize) -> Self {
        let ola_hop_size = ola_window_size / 2;
        let search_block_size = num_candidate_blocks + ola_window_size - 1;

        Self {
            channels,
            ola_window_size,
            ola_hop_size,
            num_candidate_blocks,
            search_block_size,
            ola_window: window::hann_window(ola_window_size),
            transition_window: window::transition_window(ola_window_size),
            target_block: vec![Vec::new(); channels],
            search_block: vec![Vec::new(); channels],
            optimal_block: vec![Vec::new(); channels],
            wsola_output: vec![vec![0.0; ola_window_size + ola_hop_size]; channels],
            num_complete_frames: 0,
            wsola_output_started: false,
            output_time: 0.0,
            search_block_index: 0,
            target_block_index: 0,
        }
    }

    pub fn ola_hop_size(&self) -> usize {
        self.ola_hop_size
    }

    pub fn ola_window_size(&self) -> usize {
        self.ola_window_size
    }

    pub fn complete_frames(&self) -> usize {
        self.num_complete_frames
    }

    /// Current input-buffer index of the first frame still needed by the
    /// synthesizer, used by `latency()`.
    pub fn search_block_index(&self) -> i64 {
        self.search_block_index
    }

    pub fn reset(&mut self) {
        for ch in &mut self.wsola_output {
            ch.iter_mut().for_each(|s| *s = 0.0);
        }
        self.num_complete_frames = 0;
        self.wsola_output_started = false;
        self.output_time = 0.0;
        self.search_block_index = 0;
        self.target_block_index = 0;
    }

    /// The input-buffer index one past the last frame the next iteration's
    /// search block would read, given the current fractional clock. Pure —
    /// does not mutate state. Callers (the engine) use this to decide
    /// whether to request more real input or top up with owed silence
    /// before calling `try_iterate`.
    pub fn required_frames(&self) -> i64 {
        let (_, search_block_index) = self.next_indices();
        search_block_index + self.search_block_size as i64
    }

    fn next_indices(&self) -> (i64, i64) {
        let half_window = (self.ola_window_size / 2) as i64;
        let target_block_index = self.output_time.round() as i64 - half_window;
        let search_offset = (self.num_candidate_blocks as i64 - 1) / 2;
        let search_block_index = target_block_index - search_offset;
        (target_block_index, search_block_index)
    }

    /// Attempt one WSOLA iteration. Must only be called when
    /// `complete_frames() == 0` (the accumulator has been fully drained) —
    /// the overlap-add bookkeeping below assumes the existing tail sits at
    /// the front of `wsola_output`. Returns `NeedsMoreInput` without
    /// mutating anything if the input buffer doesn't yet hold every frame
    /// the search block needs; the caller is responsible for supplying more
    /// real input or owed silence and retrying.
    pub fn try_iterate(&mut self, input: &mut InputBuffer, rate: f64) -> IterationOutcome {
        debug_assert_eq!(self.num_complete_frames, 0);

        let (target_block_index, search_block_index) = self.next_indices();
        let required_end = search_block_index + self.search_block_size as i64;
        if required_end > input.frames() as i64 {
            return IterationOutcome::NeedsMoreInput;
        }

        block::extract_target_block(
            input,
            target_block_index,
            self.ola_window_size,
            &mut self.target_block,
        );
        block::extract_search_block(
            input,
            search_block_index,
            self.search_block_size,
            &mut self.search_block,
        );

        let result = search::find_optimal_block(
            &self.target_block,
            &self.search_block,
            self.ola_window_size,
            self.num_candidate_blocks,
            SEARCH_EPSILON,
        );

        block::extract_candidate_block(
            &self.search_block,
            result.index,
            self.ola_window_size,
            &mut self.optimal_block,
        );

        // Transition blend: bias toward the geometric target at the block's
        // temporal center, toward the similarity-optimal block at its edges.
        for c in 0..self.channels {
            for k in 0..self.ola_window_size {
                let tw = self.transition_window[k];
                self.optimal_block[c][k] =
                    tw * self.target_block[c][k] + (1.0 - tw) * self.optimal_block[c][k];
            }
        }

        self.overlap_add();

        // Nudge the next target_block_index toward the sub-sample-refined
        // optimum rather than the integer offset the block was actually cut
        // at, so rounding to whole frames each iteration doesn't accumulate
        // into long-term drift.
        let search_offset = (self.num_candidate_blocks as i64 - 1) / 2;
        let drift = result.refined - search_offset as f64;

        self.output_time += self.ola_hop_size as f64 * rate + drift;

        let evict = search_block_index.min(target_block_index).max(0) as usize;
        if evict > 0 {
            input.evict(evict);
            self.output_time -= evict as f64;
        }
        self.search_block_index = search_block_index - evict as i64;
        self.target_block_index = target_block_index - evict as i64;

        IterationOutcome::Produced
    }

    fn overlap_add(&mut self) {
        let hop = self.ola_hop_size;
        let w = self.ola_window_size;

        if !self.wsola_output_started {
            for c in 0..self.channels {
                for k in 0..w {
                    self.wsola_output[c][k] = self.ola_window[k] * self.optimal_block[c][k];
                }
            }
            self.wsola_output_started = true;
            self.num_complete_frames = hop;
        } else {
            for c in 0..self.channels {
                for k in 0..hop {
                    self.wsola_output[c][k] +=
                        self.ola_window[k + hop] * self.optimal_block[c][k];
                }
                for k in hop..w {
                    self.wsola_output[c][k] =
                        self.ola_window[k - hop] * self.optimal_block[c][k];
                }
            }
            self.num_complete_frames += hop;
        }
    }

    /// Copy up to `count` complete frames into `dest` starting at
    /// `dest_offset`, left-shift the accumulator, and decrement
    /// `complete_frames()` by the amount actually copied. Returns the
    /// number of frames copied.
    pub fn drain_into(&mut self, dest: &mut [&mut [Sample]], dest_offset: usize, count: usize) -> usize {
        let count = count.min(self.num_complete_frames);
        if count == 0 {
            return 0;
        }
        for (c, out) in dest.iter_mut().enumerate() {
            out[dest_offset..dest_offset + count].copy_from_slice(&self.wsola_output[c][0..count]);
        }
        for ch in &mut self.wsola_output {
            ch.copy_within(count.., 0);
        }
        self.num_complete_frames -= count;
        count
    }
}
